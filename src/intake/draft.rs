use crate::{
    domain::{GeoPoint, OrderDetails},
    error::{BoardError, Result},
};
use serde::{Deserialize, Serialize};

/// Question the intake dialogue is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeStep {
    #[default]
    Employee,
    ClientName,
    City,
    Street,
    HouseNumber,
    Price,
    Complete,
}

impl IntakeStep {
    /// Step that follows a valid answer to this one
    pub fn next(self) -> Self {
        match self {
            Self::Employee => Self::ClientName,
            Self::ClientName => Self::City,
            Self::City => Self::Street,
            Self::Street => Self::HouseNumber,
            Self::HouseNumber => Self::Price,
            Self::Price | Self::Complete => Self::Complete,
        }
    }

    /// Name of the field this step fills
    pub fn field(self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::ClientName => "client name",
            Self::City => "city",
            Self::Street => "street",
            Self::HouseNumber => "house number",
            Self::Price => "price",
            Self::Complete => "nothing",
        }
    }
}

/// A new order being assembled one answer at a time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    step: IntakeStep,
    employee_id: Option<String>,
    client_name: Option<String>,
    city: Option<String>,
    street: Option<String>,
    house_number: Option<String>,
    price: Option<f64>,
    location: Option<GeoPoint>,
}

impl OrderDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draft whose employee was picked up front, starting at the client name
    pub fn for_employee(employee_id: impl Into<String>) -> Self {
        Self {
            step: IntakeStep::ClientName,
            employee_id: Some(employee_id.into()),
            ..Self::default()
        }
    }

    pub fn step(&self) -> IntakeStep {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.step == IntakeStep::Complete
    }

    /// Stores the answer for the current step and moves on. Invalid input
    /// leaves the draft untouched.
    pub fn advance(&mut self, input: &str) -> Result<IntakeStep> {
        let value = input.trim();
        if self.step == IntakeStep::Complete {
            return Err(BoardError::InvalidInput(
                "order draft is already complete".to_string(),
            ));
        }
        if value.is_empty() {
            return Err(BoardError::InvalidInput(format!(
                "{} must not be blank",
                self.step.field()
            )));
        }

        match self.step {
            IntakeStep::Employee => self.employee_id = Some(value.to_string()),
            IntakeStep::ClientName => self.client_name = Some(value.to_string()),
            IntakeStep::City => self.city = Some(value.to_string()),
            IntakeStep::Street => self.street = Some(value.to_string()),
            IntakeStep::HouseNumber => self.house_number = Some(value.to_string()),
            IntakeStep::Price => self.price = Some(parse_price(value)?),
            IntakeStep::Complete => {}
        }

        self.step = self.step.next();
        Ok(self.step)
    }

    pub fn set_location(&mut self, location: GeoPoint) {
        self.location = Some(location);
    }

    /// `"{city}, {street} {house}"` once all three parts are known
    pub fn address(&self) -> Option<String> {
        match (&self.city, &self.street, &self.house_number) {
            (Some(city), Some(street), Some(house)) => Some(format!("{}, {} {}", city, street, house)),
            _ => None,
        }
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn street(&self) -> Option<&str> {
        self.street.as_deref()
    }

    pub fn house_number(&self) -> Option<&str> {
        self.house_number.as_deref()
    }

    /// Finished order payload
    pub fn into_details(self) -> Result<OrderDetails> {
        let address = self.address();
        match (self.step, self.employee_id, self.client_name, address, self.price) {
            (IntakeStep::Complete, Some(employee_id), Some(client_name), Some(address), Some(price)) => {
                Ok(OrderDetails {
                    location: self.location,
                    ..OrderDetails::new(client_name, address)
                        .with_price(price)
                        .with_employee(employee_id)
                })
            }
            (step, ..) => Err(BoardError::InvalidInput(format!(
                "order draft is incomplete, waiting for {}",
                step.field()
            ))),
        }
    }
}

fn parse_price(value: &str) -> Result<f64> {
    let price: f64 = value
        .replace(',', ".")
        .parse()
        .map_err(|_| BoardError::InvalidInput(format!("price must be a number, got '{}'", value)))?;
    if !price.is_finite() || price <= 0.0 {
        return Err(BoardError::InvalidInput(format!(
            "price must be greater than zero, got '{}'",
            value
        )));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> OrderDraft {
        let mut draft = OrderDraft::new();
        for answer in ["emp-7", "Olga", "Kyiv", "Khreshchatyk", "22", "1500"] {
            draft.advance(answer).unwrap();
        }
        draft
    }

    #[test]
    fn test_steps_follow_dialogue_order() {
        let mut draft = OrderDraft::new();
        assert_eq!(draft.step(), IntakeStep::Employee);

        assert_eq!(draft.advance("emp-7").unwrap(), IntakeStep::ClientName);
        assert_eq!(draft.advance("Olga").unwrap(), IntakeStep::City);
        assert_eq!(draft.advance("Kyiv").unwrap(), IntakeStep::Street);
        assert_eq!(draft.advance("Khreshchatyk").unwrap(), IntakeStep::HouseNumber);
        assert_eq!(draft.advance("22").unwrap(), IntakeStep::Price);
        assert_eq!(draft.advance("1500").unwrap(), IntakeStep::Complete);
        assert!(draft.is_complete());
    }

    #[test]
    fn test_into_details() {
        let details = filled().into_details().unwrap();

        assert_eq!(details.client_name, "Olga");
        assert_eq!(details.address, "Kyiv, Khreshchatyk 22");
        assert_eq!(details.price, 1500.0);
        assert_eq!(details.employee_id.as_deref(), Some("emp-7"));
    }

    #[test]
    fn test_blank_answer_keeps_step() {
        let mut draft = OrderDraft::for_employee("emp-1");
        let err = draft.advance("   ").unwrap_err();

        assert!(matches!(err, BoardError::InvalidInput(_)));
        assert_eq!(draft.step(), IntakeStep::ClientName);
    }

    #[test]
    fn test_price_validation() {
        let mut draft = OrderDraft::for_employee("emp-1");
        for answer in ["Olga", "Lviv", "Rynok", "1"] {
            draft.advance(answer).unwrap();
        }

        assert!(draft.advance("cheap").is_err());
        assert!(draft.advance("0").is_err());
        assert!(draft.advance("-5").is_err());
        assert_eq!(draft.step(), IntakeStep::Price);

        assert_eq!(draft.advance("99,50").unwrap(), IntakeStep::Complete);
        assert_eq!(draft.into_details().unwrap().price, 99.5);
    }

    #[test]
    fn test_incomplete_draft_cannot_be_finished() {
        let mut draft = OrderDraft::new();
        draft.advance("emp-1").unwrap();

        assert!(matches!(
            draft.into_details(),
            Err(BoardError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_complete_draft_rejects_more_input() {
        let mut draft = filled();
        assert!(draft.advance("extra").is_err());
    }
}
