//! Form defaults and field validation done by the presentation layer.
//!
//! The orchestrator trusts whatever it is given; these checks run before submit.

use crate::error::FormError;
use crate::model::{Condition, PropertyType, SubmissionInput};

pub const MIN_SIZE_SQM: f64 = 10.0;
pub const MIN_ROOMS: f64 = 1.0;
pub const MIN_YEAR_BUILT: i32 = 1800;

/// Values the form starts with.
pub fn default_form() -> SubmissionInput {
    SubmissionInput {
        address: String::new(),
        property_type: PropertyType::Apartment,
        size_sqm: 60.0,
        rooms: 2.0,
        year_built: 1990,
        condition: Condition::WellKept,
        current_cold_rent: 500.0,
    }
}

/// Check ranges and requiredness. `current_year` caps the year built.
pub fn validate(input: &SubmissionInput, current_year: i32) -> Result<(), FormError> {
    if input.address.trim().is_empty() {
        return Err(FormError::MissingAddress);
    }
    if !(input.size_sqm >= MIN_SIZE_SQM) {
        return Err(FormError::SizeTooSmall {
            value: input.size_sqm,
            min: MIN_SIZE_SQM,
        });
    }
    // Half rooms only.
    if !(input.rooms >= MIN_ROOMS) || (input.rooms * 2.0).fract() != 0.0 {
        return Err(FormError::InvalidRooms(input.rooms));
    }
    if input.year_built < MIN_YEAR_BUILT || input.year_built > current_year {
        return Err(FormError::YearBuiltOutOfRange {
            value: input.year_built,
            min: MIN_YEAR_BUILT,
            max: current_year,
        });
    }
    if !(input.current_cold_rent >= 0.0) {
        return Err(FormError::NegativeRent(input.current_cold_rent));
    }
    Ok(())
}

/// Year used as upper bound for `year_built`.
pub fn current_year() -> i32 {
    time::OffsetDateTime::now_utc().year()
}
