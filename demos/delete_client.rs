use brightlocal::prelude::{Client, Params, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let client_id = 1;

    // Reads BRIGHT_LOCAL_API_KEY and BRIGHT_LOCAL_API_SECRET
    dotenvy::dotenv().ok();
    let client = Client::from_env()?;
    let response = client
        .delete(
            &format!("/v1/clients-and-locations/clients/{}", client_id),
            Params::new(),
        )
        .await?;

    println!("{}", response.result());
    if response.is_success() {
        println!("Successfully deleted client.");
    }

    Ok(())
}
