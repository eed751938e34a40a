//! Airline filing configuration
//!
//! Each airline accepts claims through one channel (email, web form or API),
//! insists on its own set of claim fields and documents, and answers within a
//! typical number of days. The registry ships with built-in entries and can be
//! replaced or extended from a JSON file.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use core_kernel::AirlineCode;
use crate::claim::Claim;
use crate::error::ClaimError;

/// How claims are delivered to an airline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMethod {
    Email,
    WebForm,
    Api,
}

/// Claim fields an airline can insist on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimField {
    PassengerName,
    PassengerEmail,
    FlightNumber,
    FlightDate,
    DepartureAirport,
    ArrivalAirport,
    DelayMinutes,
    BookingReference,
}

impl ClaimField {
    pub fn name(&self) -> &'static str {
        match self {
            ClaimField::PassengerName => "passenger_name",
            ClaimField::PassengerEmail => "passenger_email",
            ClaimField::FlightNumber => "flight_number",
            ClaimField::FlightDate => "flight_date",
            ClaimField::DepartureAirport => "departure_airport",
            ClaimField::ArrivalAirport => "arrival_airport",
            ClaimField::DelayMinutes => "delay_minutes",
            ClaimField::BookingReference => "booking_reference",
        }
    }

    /// The claim's value for this field, `None` when blank
    pub fn value(&self, claim: &Claim) -> Option<String> {
        let value = match self {
            ClaimField::PassengerName => claim.passenger_name.clone(),
            ClaimField::PassengerEmail => claim.passenger_email.clone(),
            ClaimField::FlightNumber => claim.flight_number.clone(),
            ClaimField::FlightDate => claim.flight_date.to_string(),
            ClaimField::DepartureAirport => claim.departure_airport.clone(),
            ClaimField::ArrivalAirport => claim.arrival_airport.clone(),
            ClaimField::DelayMinutes => {
                if claim.delay_minutes == 0 {
                    return None;
                }
                claim.delay_minutes.to_string()
            }
            ClaimField::BookingReference => claim.booking_reference.clone().unwrap_or_default(),
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Filing configuration for one airline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirlineConfig {
    pub code: AirlineCode,
    pub name: String,
    pub method: SubmissionMethod,
    /// Claims mailbox for `email`, form or API URL otherwise
    pub endpoint: String,
    pub required_fields: Vec<ClaimField>,
    #[serde(default)]
    pub required_documents: Vec<String>,
    pub expected_response_days: u32,
}

impl AirlineConfig {
    /// Required fields the claim leaves blank
    pub fn missing_fields(&self, claim: &Claim) -> Vec<&'static str> {
        self.required_fields
            .iter()
            .filter(|field| field.value(claim).is_none())
            .map(|field| field.name())
            .collect()
    }

    /// Fails with the list of blank required fields
    pub fn validate_claim(&self, claim: &Claim) -> Result<(), ClaimError> {
        let missing = self.missing_fields(claim);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ClaimError::Validation(format!(
                "{} requires {}",
                self.name,
                missing.join(", ")
            )))
        }
    }
}

/// Airline-specific submission content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirlineSubmission {
    pub claim_id: String,
    pub airline_code: AirlineCode,
    pub method: SubmissionMethod,
    pub subject: String,
    /// Plain-text letter used by the email channel
    pub body: String,
    /// Field values posted by the form and API channels
    pub fields: BTreeMap<String, String>,
    pub documents: Vec<String>,
}

impl AirlineSubmission {
    /// Builds the submission content for `claim`
    pub fn generate(config: &AirlineConfig, claim: &Claim) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("claim_reference".to_string(), claim.claim_id.to_string());
        for field in &config.required_fields {
            if let Some(value) = field.value(claim) {
                fields.insert(field.name().to_string(), value);
            }
        }
        fields.insert(
            "compensation_requested".to_string(),
            claim.estimated_compensation.amount().to_string(),
        );
        fields.insert(
            "currency".to_string(),
            claim.estimated_compensation.currency().code().to_string(),
        );

        let subject = format!(
            "EU261 compensation claim - {} on {} ({})",
            claim.flight_number, claim.flight_date, claim.claim_id
        );

        let mut body = format!(
            "Dear {} customer relations,\n\n\
             We submit this claim on behalf of {} under Regulation (EC) No 261/2004.\n\n\
             Flight: {} on {}\n\
             Route: {} - {}\n\
             Arrival delay: {} minutes\n",
            config.name,
            claim.passenger_name,
            claim.flight_number,
            claim.flight_date,
            claim.departure_airport,
            claim.arrival_airport,
            claim.delay_minutes,
        );
        if let Some(booking) = &claim.booking_reference {
            body.push_str(&format!("Booking reference: {}\n", booking));
        }
        body.push_str(&format!(
            "Compensation requested: {}\n\nOur reference: {}\n",
            claim.estimated_compensation, claim.claim_id
        ));
        if !config.required_documents.is_empty() {
            body.push_str(&format!(
                "\nEnclosed: {}\n",
                config.required_documents.join(", ")
            ));
        }

        Self {
            claim_id: claim.claim_id.to_string(),
            airline_code: config.code.clone(),
            method: config.method,
            subject,
            body,
            fields,
            documents: config.required_documents.clone(),
        }
    }
}

/// Lookup of airline configurations by IATA code
#[derive(Debug, Clone, Default)]
pub struct AirlineRegistry {
    airlines: HashMap<AirlineCode, AirlineConfig>,
}

impl AirlineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON array of airline configurations
    pub fn from_json(json: &str) -> Result<Self, ClaimError> {
        let configs: Vec<AirlineConfig> = serde_json::from_str(json)
            .map_err(|e| ClaimError::Configuration(format!("invalid airline configuration: {}", e)))?;
        let mut registry = Self::new();
        for config in configs {
            registry.insert(config);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, config: AirlineConfig) {
        self.airlines.insert(config.code.clone(), config);
    }

    pub fn get(&self, code: &AirlineCode) -> Option<&AirlineConfig> {
        self.airlines.get(code)
    }

    /// Configuration for `code`, or a `Configuration` error
    pub fn require(&self, code: &AirlineCode) -> Result<&AirlineConfig, ClaimError> {
        self.get(code).ok_or_else(|| {
            ClaimError::Configuration(format!("no filing configuration for airline {}", code))
        })
    }

    /// Display name, falling back to the code
    pub fn display_name(&self, code: &AirlineCode) -> String {
        self.get(code)
            .map(|config| config.name.clone())
            .unwrap_or_else(|| code.to_string())
    }

    pub fn len(&self) -> usize {
        self.airlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airlines.is_empty()
    }

    /// Registry with the carriers the service files with out of the box
    pub fn builtin() -> Self {
        use ClaimField::*;

        let base = vec![PassengerName, PassengerEmail, FlightNumber, FlightDate];
        let with_route = |extra: &[ClaimField]| {
            let mut fields = base.clone();
            fields.extend_from_slice(&[DepartureAirport, ArrivalAirport]);
            fields.extend_from_slice(extra);
            fields
        };

        let entries = [
            ("LH", "Lufthansa", SubmissionMethod::Api, "https://api.lufthansa.example/claims/v1",
             with_route(&[BookingReference]), vec!["boarding_pass"], 21),
            ("BA", "British Airways", SubmissionMethod::WebForm, "https://www.britishairways.example/claims/form",
             with_route(&[BookingReference, DelayMinutes]), vec!["boarding_pass", "booking_confirmation"], 28),
            ("AF", "Air France", SubmissionMethod::WebForm, "https://wwws.airfrance.example/claims/form",
             with_route(&[BookingReference]), vec!["boarding_pass"], 30),
            ("KL", "KLM", SubmissionMethod::Api, "https://api.klm.example/eu261/claims",
             with_route(&[BookingReference]), vec!["boarding_pass"], 21),
            ("FR", "Ryanair", SubmissionMethod::Email, "eu261@ryanair.example",
             with_route(&[BookingReference]), vec!["booking_confirmation"], 28),
            ("U2", "easyJet", SubmissionMethod::Email, "claims@easyjet.example",
             with_route(&[]), vec![], 28),
        ];

        let mut registry = Self::new();
        for (code, name, method, endpoint, required_fields, documents, days) in entries {
            if let Ok(code) = AirlineCode::new(code) {
                registry.insert(AirlineConfig {
                    code,
                    name: name.to_string(),
                    method,
                    endpoint: endpoint.to_string(),
                    required_fields,
                    required_documents: documents.into_iter().map(String::from).collect(),
                    expected_response_days: days,
                });
            }
        }
        registry
    }
}
