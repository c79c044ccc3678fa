//! Lightweight profiling for simulation batches: named event counts and timed spans.
//!
//! ## Example Output
//!
//! ```ignore
//! Span Label               Count          Duration  % runtime
//! ------------------------------------------------------------
//! generate population        500     1s 81ms 77us       4.71%
//! schedule vaccination       500   5s 264ms 512us      22.93%
//! build timelines            500   9s 904ms 199us      43.15%
//! aggregate mortality        500   6s 120ms 450us      26.65%
//! Total Measured               1  22s 958ms 921us      99.97%
//!
//! Event Label                    Count  Rate (per sec)
//! ----------------------------------------------------
//! run                              500           21.77
//! dose administered        142,107,263    6,188,912.44
//! death-related cancellation 1,251,908       54,521.25
//! HVE cancellation           1,311,204       57,103.59
//!
//! Dose cancellations: 2,563,112 (48.84% death-related, 51.16% HVE)
//! ```
//!
//! Count events with `increment_named_count("run")` or, for counts accumulated elsewhere,
//! `add_to_named_count("dose administered", n)`. Runs execute in parallel, so the hot loops keep
//! their own counters and add them here once per run.
//!
//! Time an operation with a span, which is closed when dropped:
//!
//! ```rust,ignore
//! let _span = open_span("build timelines");
//! let timelines = build_timelines(...);
//! ```
//!
//! The `"Total Measured"` span is open whenever any other span is open, and shows how much of
//! the runtime is covered by spans. Spans from parallel runs overlap, so their durations can add
//! up to more than the wall-clock runtime.

use humantime::format_duration;
use indexmap::IndexMap;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

pub const DOSE_ADMINISTERED_LABEL: &str = "dose administered";
pub const DEATH_CANCELLATION_LABEL: &str = "death-related cancellation";
pub const HVE_CANCELLATION_LABEL: &str = "HVE cancellation";

const TOTAL_MEASURED: &str = "Total Measured";
static PROFILING_DATA: OnceLock<Mutex<ProfilingDataContainer>> = OnceLock::new();

fn profiling_data() -> MutexGuard<'static, ProfilingDataContainer> {
    PROFILING_DATA
        .get_or_init(|| Mutex::new(ProfilingDataContainer::default()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

pub struct Span {
    label: &'static str,
    start_time: Instant,
}

impl Span {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            start_time: Instant::now(),
        }
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        let mut container = profiling_data();
        container.close_span(self.label, self.start_time.elapsed());
    }
}

#[derive(Default)]
struct ProfilingDataContainer {
    start_time: Option<Instant>,
    counts: IndexMap<&'static str, usize>,
    // Span counts are stored with the span duration because they are displayed together.
    spans: IndexMap<&'static str, (Duration, usize)>,
    // `Total Measured` is opened when this leaves 0 and closed when it returns to 0.
    open_span_count: usize,
    coverage: Option<Instant>,
}

impl ProfilingDataContainer {
    fn add_to_named_count(&mut self, key: &'static str, amount: usize) {
        self.init_start_time();
        *self.counts.entry(key).or_insert(0) += amount;
    }

    fn get_named_count(&self, key: &'static str) -> Option<usize> {
        self.counts.get(&key).copied()
    }

    fn init_start_time(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
    }

    fn open_span(&mut self) {
        self.init_start_time();
        if self.open_span_count == 0 {
            self.coverage = Some(Instant::now());
        }
        self.open_span_count += 1;
    }

    fn close_span(&mut self, label: &'static str, elapsed: Duration) {
        self.open_span_count = self.open_span_count.saturating_sub(1);
        if self.open_span_count == 0 {
            if let Some(coverage) = self.coverage.take() {
                self.record_span(TOTAL_MEASURED, coverage.elapsed());
            }
        }
        self.record_span(label, elapsed);
    }

    fn record_span(&mut self, label: &'static str, elapsed: Duration) {
        let (time, count) = self.spans.entry(label).or_insert((Duration::ZERO, 0));
        *time += elapsed;
        *count += 1;
    }

    fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map_or(0.0, |start| start.elapsed().as_secs_f64())
    }

    fn named_count_rows(&self) -> Vec<Vec<String>> {
        let elapsed = self.elapsed_secs();
        let mut rows = vec![vec![
            "Event Label".to_string(),
            "Count".to_string(),
            "Rate (per sec)".to_string(),
        ]];
        for (key, count) in &self.counts {
            #[allow(clippy::cast_precision_loss)]
            let rate = if elapsed > 0.0 {
                (*count as f64) / elapsed
            } else {
                0.0
            };
            rows.push(vec![
                (*key).to_string(),
                format_with_commas(*count),
                format_with_commas_f64(rate),
            ]);
        }
        rows
    }

    fn named_span_rows(&self) -> Vec<Vec<String>> {
        let elapsed = self.elapsed_secs();
        let percent = |duration: &Duration| {
            if elapsed > 0.0 {
                duration.as_secs_f64() / elapsed * 100.0
            } else {
                0.0
            }
        };
        let mut rows = vec![vec![
            "Span Label".to_string(),
            "Count".to_string(),
            "Duration".to_string(),
            "% runtime".to_string(),
        ]];
        for (key, (duration, count)) in self.spans.iter().filter(|(key, _)| **key != TOTAL_MEASURED) {
            rows.push(vec![
                (*key).to_string(),
                count.to_string(),
                format_duration(*duration).to_string(),
                format!("{:.2}%", percent(duration)),
            ]);
        }
        // Make TOTAL_MEASURED the last row
        if let Some((duration, count)) = self.spans.get(&TOTAL_MEASURED) {
            rows.push(vec![
                TOTAL_MEASURED.to_string(),
                count.to_string(),
                format_duration(*duration).to_string(),
                format!("{:.2}%", percent(duration)),
            ]);
        }
        rows
    }

    fn cancellation_summary(&self) -> Option<String> {
        let death = self.get_named_count(DEATH_CANCELLATION_LABEL).unwrap_or(0);
        let hve = self.get_named_count(HVE_CANCELLATION_LABEL).unwrap_or(0);
        let total = death + hve;
        if total == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let share = |n: usize| (n as f64) / (total as f64) * 100.0;
        Some(format!(
            "Dose cancellations: {} ({:.2}% death-related, {:.2}% HVE)",
            format_with_commas(total),
            share(death),
            share(hve)
        ))
    }
}

pub fn increment_named_count(key: &'static str) {
    add_to_named_count(key, 1);
}

pub fn add_to_named_count(key: &'static str, amount: usize) {
    let mut container = profiling_data();
    container.add_to_named_count(key, amount);
}

pub fn open_span(label: &'static str) -> Span {
    let mut container = profiling_data();
    container.open_span();
    Span::new(label)
}

/// Prints the span table, the count table and the cancellation breakdown.
pub fn print_profiling_data() {
    let container = profiling_data();
    if !container.spans.is_empty() {
        println!();
        print_formatted_table(&container.named_span_rows());
    }
    if !container.counts.is_empty() {
        println!();
        print_formatted_table(&container.named_count_rows());
    }
    if let Some(summary) = container.cancellation_summary() {
        println!();
        println!("{summary}");
    }
}

/// Prints a table with aligned columns, using the first row as a header.
/// The first column is left-aligned; remaining columns are right-aligned.
fn print_formatted_table(rows: &[Vec<String>]) {
    for line in format_table(rows) {
        println!("{line}");
    }
}

fn format_table(rows: &[Vec<String>]) -> Vec<String> {
    if rows.len() < 2 {
        return vec![];
    }

    let num_cols = rows[0].len();
    let mut col_widths = vec![0; num_cols];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            col_widths[i] = col_widths[i].max(cell.chars().count());
        }
    }

    let format_row = |row: &Vec<String>| {
        row.iter()
            .enumerate()
            .map(|(i, cell)| {
                if i == 0 {
                    format!("{:<width$} ", cell, width = col_widths[i] + 1)
                } else {
                    format!("{:>width$} ", cell, width = col_widths[i] + 1)
                }
            })
            .collect::<String>()
    };

    let total_width: usize = col_widths.iter().map(|w| *w + 1).sum::<usize>() + 2;
    let mut lines = vec![format_row(&rows[0]), "-".repeat(total_width)];
    lines.extend(rows[1..].iter().map(format_row));
    lines
}

/// Formats an integer with thousands separator.
#[must_use]
pub fn format_with_commas(value: usize) -> String {
    group_thousands(&value.to_string())
}

/// Formats a float to two decimals with thousands separator.
#[must_use]
pub fn format_with_commas_f64(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));
    let mut result = group_thousands(int_part);
    if !frac_part.is_empty() {
        result.push('.');
        result.push_str(frac_part);
    }
    if value.is_sign_negative() && value != 0.0 {
        result.insert(0, '-');
    }
    result
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        result.push(c);
        let digits_left = len - i - 1;
        if digits_left > 0 && digits_left % 3 == 0 {
            result.push(',');
        }
    }
    result
}
