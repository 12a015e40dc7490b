#[tokio::main]
async fn main() {
    booking_assistant::run().await;
}
