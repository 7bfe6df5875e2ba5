use zonaprint_api::db::{create_orm_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // only the database is needed here, not the full server config
    let database_url = std::env::var("DATABASE_URL")?;
    let dir = std::env::args().nth(1).unwrap_or_else(|| "migrations".to_string());
    let orm = create_orm_conn(&database_url).await?;
    let applied = run_migrations(&orm, &dir).await?;
    println!("Applied {applied} migration file(s) from {dir}");
    Ok(())
}
