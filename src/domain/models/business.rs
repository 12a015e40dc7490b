use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use sqlx::FromRow;

use crate::domain::models::slot::TimeWindow;
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Service {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

impl Service {
    pub fn new(business_id: String, name: String, duration_minutes: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            business_id,
            name,
            duration_minutes,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Business {
    pub id: String,
    pub messaging_address: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub timezone: String,
    pub open_hour: i32,
    pub close_hour: i32,
    #[serde(skip_serializing)]
    pub calendar_id: Option<String>,
    pub booking_enabled: bool,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub services: Vec<Service>,
}

pub struct NewBusinessParams {
    pub messaging_address: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub timezone: String,
    pub open_hour: i32,
    pub close_hour: i32,
    pub calendar_id: Option<String>,
    pub booking_enabled: bool,
    pub services: Vec<(String, i32)>,
}

/// What the `info` intent answers with.
#[derive(Debug, Serialize, Clone)]
pub struct BusinessInfo {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub opening_hours: String,
    pub timezone: String,
    pub services: Vec<ServiceInfo>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ServiceInfo {
    pub name: String,
    pub duration_minutes: i32,
}

impl Business {
    pub fn new(params: NewBusinessParams) -> Self {
        let id = Uuid::new_v4().to_string();
        let services = params.services
            .into_iter()
            .map(|(name, duration)| Service::new(id.clone(), name, duration))
            .collect();

        Self {
            id,
            messaging_address: params.messaging_address,
            name: params.name,
            address: params.address,
            phone: params.phone,
            email: params.email,
            description: params.description,
            timezone: params.timezone,
            open_hour: params.open_hour,
            close_hour: params.close_hour,
            calendar_id: params.calendar_id,
            booking_enabled: params.booking_enabled,
            created_at: Utc::now(),
            services,
        }
    }

    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    pub fn find_service(&self, name: &str) -> Option<&Service> {
        let wanted = name.trim().to_lowercase();
        self.services.iter().find(|s| s.name.to_lowercase() == wanted)
    }

    pub fn find_service_by_id(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    /// Checks the attributes a booking relies on. Fails with `Configuration`.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.timezone.parse::<Tz>().is_err() {
            return Err(AppError::Configuration(format!("Unknown timezone '{}' for business {}", self.timezone, self.id)));
        }
        if !(0..=23).contains(&self.open_hour) || !(1..=24).contains(&self.close_hour) || self.open_hour >= self.close_hour {
            return Err(AppError::Configuration(format!(
                "Malformed opening hours {}-{} for business {}", self.open_hour, self.close_hour, self.id
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for service in &self.services {
            if service.duration_minutes <= 0 {
                return Err(AppError::Configuration(format!("Service '{}' has a non-positive duration", service.name)));
            }
            if !seen.insert(service.name.to_lowercase()) {
                return Err(AppError::Configuration(format!("Duplicate service name '{}'", service.name)));
            }
        }
        Ok(())
    }

    /// The default opening window on `date`, local wall-clock.
    pub fn default_window(&self, date: NaiveDate) -> Result<TimeWindow, AppError> {
        self.validate()?;
        let midnight = date.and_hms_opt(0, 0, 0).ok_or(AppError::Internal)?;
        Ok(TimeWindow {
            start: midnight + Duration::hours(self.open_hour as i64),
            end: midnight + Duration::hours(self.close_hour as i64),
        })
    }

    pub fn info(&self) -> BusinessInfo {
        BusinessInfo {
            name: self.name.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            description: self.description.clone(),
            opening_hours: format!("{:02}:00-{:02}:00", self.open_hour, self.close_hour),
            timezone: self.timezone.clone(),
            services: self.services.iter().map(|s| ServiceInfo {
                name: s.name.clone(),
                duration_minutes: s.duration_minutes,
            }).collect(),
        }
    }
}
