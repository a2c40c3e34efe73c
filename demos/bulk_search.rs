use brightlocal::prelude::{Client, Params, Result};
use serde_json::json;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Reads BRIGHT_LOCAL_API_KEY and BRIGHT_LOCAL_API_SECRET
    dotenvy::dotenv().ok();
    let client = Client::from_env()?;

    // Step 1: Create a new batch
    let mut batch = client
        .create_batch(false, None)
        .await
        .map_err(brightlocal::Error::from)?;
    println!("Created batch ID {:?}", batch.id());

    // Step 2: Add a rankings job to the batch
    let params = Params::new()
        .with("search-engine", "google")
        .with("country", "USA")
        .with("google-location", "Nashville, TN")
        .with("search-terms", json!(["veterinary", "veterinary near me"]))
        .with("urls", json!(["https://mypetswellness.net/"]))
        .with("business-names", json!(["mypetswellness"]));

    match batch.add_job("/v4/rankings/bulk-search", params).await {
        Ok(response) => println!("Added job with ID {}", response.result()["job-id"]),
        Err(e) => eprintln!("Job for google not added: {}", e),
    }

    // Step 3: Commit the batch so processing starts
    batch.commit().await.map_err(brightlocal::Error::from)?;
    println!("Batch committed successfully, awaiting results.");

    // Step 4: Poll until the batch is finished or stopped
    let response = batch
        .wait_for_results(Duration::from_secs(5), 120)
        .await
        .map_err(brightlocal::Error::from)?;
    println!("{}", serde_json::to_string_pretty(response.result())?);

    Ok(())
}
