#[actix_web::main]
async fn main() -> std::io::Result<()> {
    rent_invoice_server::run().await
}
