use env_logger::Env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env は任意
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    app_lib::run().await
}
