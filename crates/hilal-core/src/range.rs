use crate::date::{NormalizedDate, is_last_day_of_month};

/// True iff the closed intervals `[a_start, a_end]` and `[b_start, b_end]`
/// share at least one instant. Both intervals must already be ordered.
#[inline]
pub fn overlaps(
    a_start: NormalizedDate,
    a_end: NormalizedDate,
    b_start: NormalizedDate,
    b_end: NormalizedDate,
) -> bool {
    a_start <= b_end && b_start <= a_end
}

/// A holiday ending on the last day of the month right before `month_start`'s
/// month still belongs in that month's legend.
///
/// The year must match exactly, so a holiday ending on December 31 is never a
/// carry-over into the following January.
pub fn is_carry_over(holiday_end: NormalizedDate, month_start: NormalizedDate) -> bool {
    holiday_end.year() == month_start.year()
        && holiday_end.month() + 1 == month_start.month()
        && is_last_day_of_month(holiday_end.date())
}
