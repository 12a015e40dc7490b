use serde::Serialize;
use crate::domain::models::booking::Booking;

#[derive(Serialize)]
pub struct BusinessCreatedResponse {
    pub business_id: String,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub date: String,
    pub service: String,
    pub slots: Vec<String>,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub status: &'static str,
    pub booking: Option<Booking>,
}

#[derive(Serialize)]
pub struct WebhookReply {
    pub reply: Option<String>,
}
