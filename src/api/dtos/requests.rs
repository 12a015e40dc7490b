use serde::Deserialize;

#[derive(Deserialize)]
pub struct ServiceRequest {
    pub name: String,
    pub duration_minutes: i32,
}

#[derive(Deserialize)]
pub struct CreateBusinessRequest {
    pub messaging_address: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub timezone: Option<String>,
    /// `"9-18"` style opening hours.
    pub booking_hours: Option<String>,
    pub calendar_id: Option<String>,
    pub booking_enabled: Option<bool>,
    #[serde(default)]
    pub services: Vec<ServiceRequest>,
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub service: String,
    pub date: String,
}

#[derive(Deserialize)]
pub struct BookRequest {
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub service: String,
    pub date: String,
    pub time: String,
}

#[derive(Deserialize)]
pub struct CustomerRequest {
    pub customer_id: String,
}

#[derive(Deserialize)]
pub struct ModifyRequest {
    pub customer_id: String,
    pub date: String,
    pub time: String,
}

#[derive(Deserialize)]
pub struct WebhookMessage {
    pub business_address: String,
    pub customer_address: String,
    pub customer_name: Option<String>,
    pub text: String,
}
