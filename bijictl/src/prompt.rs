use inquire::validator::Validation;
use libbiji::location::NewLocation;
use std::ops::RangeInclusive;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Prompt(#[from] inquire::InquireError),
}

fn coordinate_prompt(message: &str, range: RangeInclusive<f64>) -> inquire::CustomType<'_, f64> {
    inquire::CustomType::<f64>::new(message)
        .with_error_message("Please enter a number")
        .with_validator(move |value: &f64| {
            if range.contains(value) {
                Ok(Validation::Valid)
            } else {
                Ok(Validation::Invalid(
                    format!("Must be between {} and {}", range.start(), range.end()).into(),
                ))
            }
        })
}

/// Ask for all the values of a new location
pub fn prompt_location() -> Result<NewLocation, Error> {
    let name = inquire::Text::new("Name:")
        .with_help_message("The first word is used as the category")
        .with_validator(inquire::required!("A name is required"))
        .prompt()?;
    let description = inquire::Text::new("Description:")
        .prompt_skippable()?
        .unwrap_or_default();
    let latitude = coordinate_prompt("Latitude:", -90.0..=90.0).prompt()?;
    let longitude = coordinate_prompt("Longitude:", -180.0..=180.0).prompt()?;
    Ok(NewLocation::new(name, description, latitude, longitude))
}
