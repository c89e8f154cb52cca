//! # Derived views over the ledger
//!
//! Pure, synchronous projections of the cached records plus the ephemeral
//! [`SelectionState`]. Nothing here performs I/O; callers re-run the functions
//! whenever the records or the selection change.
//!
//! | Function | Result |
//! |----------|--------|
//! | [`available_years`] | Sorted distinct years over *all* records |
//! | [`filtered_records`] | Records of one month tag in one year |
//! | [`monthly_total`] | Sum of amounts over a filtered set |
//! | [`total_pages`] / [`paged_records`] | Fixed-size pagination window |
//! | [`income_status`] | How a total compares with the monthly income |
//! | [`annual_totals`] | Twelve monthly buckets for a year, ignoring the month filter |
//!
//! [`MonthView::compute`] bundles the month screen and applies the selection
//! self-correction rules (year snapping, page clamping) as a side effect.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, Local};

use crate::models::ExpenseRecord;
use crate::month::{month_number, parse_date, year_of};

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Sorted, de-duplicated calendar years of every record with a valid date.
pub fn available_years(records: &[ExpenseRecord]) -> Vec<i32> {
    records
        .iter()
        .filter_map(|r| year_of(&r.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Records tagged with `month` whose date falls in `year`.
pub fn filtered_records<'a>(
    records: &'a [ExpenseRecord],
    month: &str,
    year: i32,
) -> Vec<&'a ExpenseRecord> {
    records
        .iter()
        .filter(|r| r.month == month && year_of(&r.date) == Some(year))
        .collect()
}

pub fn monthly_total(filtered: &[&ExpenseRecord]) -> f64 {
    filtered.iter().map(|r| r.amount).sum()
}

/// Number of pages needed for `count` items; never less than one.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    count.div_ceil(page_size).max(1)
}

/// The 1-based `page` of `filtered`. Pages past the end are empty.
pub fn paged_records<'a, T>(filtered: &'a [T], page: usize, page_size: usize) -> &'a [T] {
    let page_size = page_size.max(1);
    let start = page.saturating_sub(1).saturating_mul(page_size).min(filtered.len());
    let end = start.saturating_add(page_size).min(filtered.len());
    &filtered[start..end]
}

/// Records owned by `owner_id`, or all of them when no owner is given.
pub fn records_for_owner<'a>(
    records: &'a [ExpenseRecord],
    owner_id: Option<&str>,
) -> Vec<&'a ExpenseRecord> {
    records
        .iter()
        .filter(|r| owner_id.map_or(true, |owner| r.owner_id == owner))
        .collect()
}

/// How a monthly total compares with the identity's income.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncomeStatus {
    /// Nothing spent.
    Zero,
    /// Income unknown.
    Default,
    Ok,
    /// At least 80% of the income spent.
    Alert,
    /// Income reached or exceeded.
    Critical,
}

impl IncomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeStatus::Zero => "zero",
            IncomeStatus::Default => "default",
            IncomeStatus::Ok => "ok",
            IncomeStatus::Alert => "alert",
            IncomeStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for IncomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn income_status(total: f64, income: f64) -> IncomeStatus {
    if total <= 0.0 {
        return IncomeStatus::Zero;
    }
    if income <= 0.0 {
        return IncomeStatus::Default;
    }
    let ratio = total / income;
    if ratio >= 1.0 {
        IncomeStatus::Critical
    } else if ratio >= 0.8 {
        IncomeStatus::Alert
    } else {
        IncomeStatus::Ok
    }
}

/// Month-by-month totals for one year.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnualSummary {
    pub year: i32,
    /// Index 0 is January.
    pub months: [f64; 12],
}

impl AnnualSummary {
    pub fn total_for_year(&self) -> f64 {
        self.months.iter().sum()
    }
}

/// Sum every record dated in `year` into its month bucket.
///
/// The bucket comes from the record's month tag, or from its date when the tag
/// is not a month number.
pub fn annual_totals(records: &[ExpenseRecord], year: i32) -> AnnualSummary {
    let mut months = [0.0; 12];
    for record in records {
        let Some(date) = parse_date(&record.date) else {
            continue;
        };
        if date.year() != year {
            continue;
        }
        let month = month_number(&record.month).unwrap_or_else(|| date.month());
        months[(month - 1) as usize] += record.amount;
    }
    AnnualSummary { year, months }
}

/// Format an amount the way the ledger displays money: `R$ 45,50`.
pub fn format_currency(value: f64) -> String {
    format_currency_with("R$", value)
}

pub fn format_currency_with(symbol: &str, value: f64) -> String {
    format!("{symbol} {}", format!("{value:.2}").replace('.', ","))
}

/// Which month, year and page the user is looking at. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_month: String,
    pub selected_year: Option<i32>,
    pub current_page: usize,
}

impl Default for SelectionState {
    /// Current month and year of the local clock, first page.
    fn default() -> Self {
        let today = Local::now().date_naive();
        Self::new(today.month().to_string(), Some(today.year()))
    }
}

impl SelectionState {
    pub fn new(month: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            selected_month: month.into(),
            selected_year: year,
            current_page: 1,
        }
    }

    pub fn select_month(&mut self, month: impl Into<String>) {
        let month = month.into();
        if month != self.selected_month {
            self.selected_month = month;
            self.current_page = 1;
        }
    }

    pub fn select_year(&mut self, year: i32) {
        if self.selected_year != Some(year) {
            self.selected_year = Some(year);
            self.current_page = 1;
        }
    }

    /// Snap the year to the most recent available one when the current
    /// selection is not among `years`. No year is selected when `years` is empty.
    pub fn sync_years(&mut self, years: &[i32]) {
        let keep = self.selected_year.is_some_and(|y| years.contains(&y));
        if keep {
            return;
        }
        let snapped = years.last().copied();
        if snapped != self.selected_year {
            self.selected_year = snapped;
            self.current_page = 1;
        }
    }

    /// Pull the page back inside `[1, total_pages]`.
    pub fn clamp_page(&mut self, total_pages: usize) {
        self.current_page = self.current_page.min(total_pages).max(1);
    }

    pub fn go_to_page(&mut self, page: usize, total_pages: usize) {
        self.current_page = page;
        self.clamp_page(total_pages);
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.go_to_page(self.current_page.saturating_add(1), total_pages);
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.saturating_sub(1).max(1);
    }
}

/// Everything the month screen shows.
#[derive(Clone, Debug, PartialEq)]
pub struct MonthView {
    pub years: Vec<i32>,
    pub month: String,
    pub year: Option<i32>,
    /// Records on the current page.
    pub records: Vec<ExpenseRecord>,
    /// Size of the whole filtered set, across pages.
    pub filtered_count: usize,
    /// Total of the whole filtered set, across pages.
    pub total: f64,
    pub page: usize,
    pub total_pages: usize,
    pub status: IncomeStatus,
}

impl MonthView {
    /// Derive the month screen, correcting `selection` in place first.
    pub fn compute(
        records: &[ExpenseRecord],
        selection: &mut SelectionState,
        monthly_income: f64,
        page_size: usize,
    ) -> Self {
        let years = available_years(records);
        selection.sync_years(&years);

        let filtered = match selection.selected_year {
            Some(year) => filtered_records(records, &selection.selected_month, year),
            None => Vec::new(),
        };
        let total = monthly_total(&filtered);
        let pages = total_pages(filtered.len(), page_size);
        selection.clamp_page(pages);

        let page = paged_records(&filtered, selection.current_page, page_size)
            .iter()
            .map(|r| (*r).clone())
            .collect();

        Self {
            years,
            month: selection.selected_month.clone(),
            year: selection.selected_year,
            records: page,
            filtered_count: filtered.len(),
            total,
            page: selection.current_page,
            total_pages: pages,
            status: income_status(total, monthly_income),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, amount: f64, date: &str, month: &str) -> ExpenseRecord {
        ExpenseRecord {
            id: id.to_string(),
            description: format!("item {id}"),
            category: "General".to_string(),
            amount,
            date: date.to_string(),
            month: month.to_string(),
            owner_id: "2".to_string(),
        }
    }

    fn june(count: usize) -> Vec<ExpenseRecord> {
        (0..count)
            .map(|i| record(&i.to_string(), 10.0, "2024-06-10", "6"))
            .collect()
    }

    #[test]
    fn test_available_years_sorted_distinct() {
        let records = vec![
            record("a", 1.0, "2024-01-02", "1"),
            record("b", 1.0, "2022-05-02", "5"),
            record("c", 1.0, "2024-07-02", "7"),
            record("d", 1.0, "", "7"),
        ];
        assert_eq!(available_years(&records), vec![2022, 2024]);
        assert_eq!(available_years(&records), available_years(&records));
        assert!(available_years(&[]).is_empty());
    }

    #[test]
    fn test_filtered_records_match_month_and_year() {
        let records = vec![
            record("a", 1.0, "2024-06-02", "6"),
            record("b", 2.0, "2023-06-02", "6"),
            record("c", 4.0, "2024-07-02", "7"),
        ];
        let filtered = filtered_records(&records, "6", 2024);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "a");
        assert_eq!(monthly_total(&filtered), 1.0);
    }

    #[test]
    fn test_pagination_bounds() {
        assert_eq!(total_pages(0, 5), 1);
        assert_eq!(total_pages(5, 5), 1);
        assert_eq!(total_pages(6, 5), 2);

        let items: Vec<usize> = (0..12).collect();
        assert_eq!(paged_records(&items, 1, 5), &[0, 1, 2, 3, 4]);
        assert_eq!(paged_records(&items, 3, 5), &[10, 11]);
        assert!(paged_records(&items, 4, 5).is_empty());
        for page in 1..=total_pages(items.len(), 5) {
            assert!(paged_records(&items, page, 5).len() <= 5);
        }
        assert!(total_pages(items.len(), 5) * 5 >= items.len());
    }

    #[test]
    fn test_income_status_thresholds() {
        assert_eq!(income_status(1000.0, 1000.0), IncomeStatus::Critical);
        assert_eq!(income_status(799.0, 1000.0), IncomeStatus::Ok);
        assert_eq!(income_status(800.0, 1000.0), IncomeStatus::Alert);
        assert_eq!(income_status(0.0, 1000.0), IncomeStatus::Zero);
        assert_eq!(income_status(50.0, 0.0), IncomeStatus::Default);
        assert_eq!(income_status(1200.0, 1000.0).to_string(), "critical");
    }

    #[test]
    fn test_annual_totals_ignore_month_filter() {
        let records = vec![
            record("a", 10.0, "2024-01-05", "1"),
            record("b", 5.0, "2024-01-20", "1"),
            record("c", 7.5, "2024-12-31", "12"),
            record("d", 3.0, "2024-03-03", "?"),
            record("e", 99.0, "2023-03-03", "3"),
        ];
        let summary = annual_totals(&records, 2024);
        assert_eq!(summary.months[0], 15.0);
        assert_eq!(summary.months[2], 3.0);
        assert_eq!(summary.months[11], 7.5);
        assert_eq!(summary.total_for_year(), 25.5);
    }

    #[test]
    fn test_selection_resets_page_on_month_or_year_change() {
        let mut selection = SelectionState::new("6", Some(2024));
        selection.current_page = 3;
        selection.select_month("6");
        assert_eq!(selection.current_page, 3);
        selection.select_month("7");
        assert_eq!(selection.current_page, 1);
        selection.current_page = 2;
        selection.select_year(2023);
        assert_eq!(selection.current_page, 1);
    }

    #[test]
    fn test_selection_snaps_year() {
        let mut selection = SelectionState::new("6", Some(2020));
        selection.sync_years(&[2022, 2024]);
        assert_eq!(selection.selected_year, Some(2024));
        selection.sync_years(&[2022, 2024]);
        assert_eq!(selection.selected_year, Some(2024));
        selection.sync_years(&[]);
        assert_eq!(selection.selected_year, None);
    }

    #[test]
    fn test_page_navigation_is_clamped() {
        let mut selection = SelectionState::new("6", Some(2024));
        selection.next_page(2);
        selection.next_page(2);
        assert_eq!(selection.current_page, 2);
        selection.previous_page();
        selection.previous_page();
        assert_eq!(selection.current_page, 1);
        selection.go_to_page(0, 2);
        assert_eq!(selection.current_page, 1);
    }

    #[test]
    fn test_month_view_total_spans_all_pages() {
        let records = june(7);
        let mut selection = SelectionState::new("6", Some(2024));
        let first = MonthView::compute(&records, &mut selection, 0.0, 5);
        selection.next_page(first.total_pages);
        let second = MonthView::compute(&records, &mut selection, 0.0, 5);

        assert_eq!(first.records.len(), 5);
        assert_eq!(second.records.len(), 2);
        assert_eq!(first.total, 70.0);
        assert_eq!(second.total, 70.0);
        assert_eq!(second.filtered_count, 7);
    }

    #[test]
    fn test_month_view_snaps_page_when_records_shrink() {
        let mut records = june(6);
        let mut selection = SelectionState::new("6", Some(2024));
        selection.go_to_page(2, 2);
        let view = MonthView::compute(&records, &mut selection, 0.0, 5);
        assert_eq!(view.page, 2);
        assert_eq!(view.records.len(), 1);

        records.pop();
        let view = MonthView::compute(&records, &mut selection, 0.0, 5);
        assert_eq!(view.total_pages, 1);
        assert_eq!(view.page, 1);
        assert_eq!(selection.current_page, 1);
    }

    #[test]
    fn test_month_view_without_records() {
        let mut selection = SelectionState::new("6", Some(2024));
        let view = MonthView::compute(&[], &mut selection, 100.0, 5);
        assert_eq!(view.year, None);
        assert!(view.records.is_empty());
        assert_eq!(view.total_pages, 1);
        assert_eq!(view.page, 1);
        assert_eq!(view.status, IncomeStatus::Zero);
    }

    #[test]
    fn test_records_for_owner() {
        let mut other = record("x", 1.0, "2024-01-01", "1");
        other.owner_id = "3".to_string();
        let records = vec![record("a", 1.0, "2024-01-01", "1"), other];
        assert_eq!(records_for_owner(&records, Some("3")).len(), 1);
        assert_eq!(records_for_owner(&records, None).len(), 2);
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(45.5), "R$ 45,50");
        assert_eq!(format_currency(0.0), "R$ 0,00");
        assert_eq!(format_currency_with("$", 1234.567), "$ 1234,57");
    }
}
