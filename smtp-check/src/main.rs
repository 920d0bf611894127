use mail_groups::{
    config,
    mail::{OutboundMessage, SmtpTransport, Transport},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // Same sources as the server, without the store settings
    let smtp = config::load_mail_config()?.smtp;
    let user = smtp.user.clone().ok_or("Missing SMTP_USER or SMTP_PASSWORD")?;

    let transport = SmtpTransport::from_config(&smtp)?;
    tracing::info!("Connecting to {}:{} as {}", smtp.host, smtp.port, user);

    let message = OutboundMessage::builder()
        .from(user.clone())
        .subject("SMTP sanity test")
        .text("If you received this, SMTP auth works.")
        .recipients([user])
        .build()?;

    transport.send(&message).await?;

    println!("Sent!");
    Ok(())
}
