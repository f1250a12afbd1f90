//! Expansion of a slot template into concrete dated slots.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use trainhub_core::AppError;

use super::model::{GenerateSlotsDto, TimeSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSlot {
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Checks that each half-day of the template is ordered and that the
/// morning does not run into the afternoon.
pub fn validate_template(template: &GenerateSlotsDto) -> Result<(), AppError> {
    let kind = template.time_slot_type;

    if kind.includes_morning() && template.morning_start >= template.morning_end {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Morning start time must be before morning end time"
        )));
    }

    if kind.includes_afternoon() && template.afternoon_start >= template.afternoon_end {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Afternoon start time must be before afternoon end time"
        )));
    }

    if kind.includes_morning()
        && kind.includes_afternoon()
        && template.morning_end > template.afternoon_start
    {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "Morning must end before the afternoon starts"
        )));
    }

    Ok(())
}

/// Every slot the template yields between `start` and `end` inclusive, in
/// date order with the morning first.
pub fn plan_slots(
    template: &GenerateSlotsDto,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PlannedSlot>, AppError> {
    validate_template(template)?;

    let kind = template.time_slot_type;
    let mut planned = Vec::new();

    for date in start.iter_days().take_while(|d| *d <= end) {
        if template.skip_weekends && is_weekend(date) {
            continue;
        }

        if kind.includes_morning() {
            planned.push(PlannedSlot {
                date,
                time_slot: TimeSlot::Morning,
                start_time: template.morning_start,
                end_time: template.morning_end,
            });
        }

        if kind.includes_afternoon() {
            planned.push(PlannedSlot {
                date,
                time_slot: TimeSlot::Afternoon,
                start_time: template.afternoon_start,
                end_time: template.afternoon_end,
            });
        }
    }

    if planned.is_empty() {
        return Err(AppError::bad_request(anyhow::anyhow!(
            "No slots to generate for this range"
        )));
    }

    Ok(planned)
}
