pub mod api;
pub mod dashboard;
pub mod movements;
pub mod session;
pub mod settings;
pub mod storage;
pub mod validation;

use api::{cliente, ApiClient, MovementQuery};
use movements::{MovementFilter, SortOrder};
use session::AuthSession;
use std::sync::Arc;

const MOVEMENT_PAGE_SIZE: u32 = 100;

fn selector_from_env<T: std::str::FromStr + Default>(key: &str) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unknown {} value {:?}", key, raw);
            T::default()
        }),
        Err(_) => T::default(),
    }
}

/// Restore the stored session and print the account state, or check the
/// API when nobody is signed in.
pub async fn run() -> anyhow::Result<()> {
    env_logger::init();

    let settings = settings::load();
    log::info!("Using API at {}", settings.api_url);

    let client = Arc::new(ApiClient::from_settings(&settings, settings.open_storage())?);
    let session = AuthSession::new(client.clone());

    if !session.restore() {
        let status = cliente::test_connection(&client).await;
        println!(
            "Not signed in. API {} at {}: {}",
            if status.connected { "reachable" } else { "unreachable" },
            status.base_url,
            status.message
        );
        return Ok(());
    }

    let client_id = session.current_profile().map(|p| p.id).unwrap_or_default();
    let board = match dashboard::load(&client, client_id).await {
        Ok(board) => board,
        Err(e) if e.is_auth_expired() => {
            println!("{}", e.user_message());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", board.profile.full_name());
    println!("Balance: ${:.2}", board.balance());
    if let Some(warning) = &board.warning {
        println!("{}", warning);
    }

    let filter: MovementFilter = selector_from_env("MOVEMENT_FILTER");
    let order: SortOrder = selector_from_env("MOVEMENT_SORT");
    let page = cliente::list_movements(&client, &MovementQuery::recent(MOVEMENT_PAGE_SIZE)).await?;
    for movement in movements::apply(&page.movements, filter, order) {
        println!(
            "{:<12} {:<20} {:>12}",
            movement.fecha,
            movement.type_name(),
            movement.display_amount()
        );
    }

    Ok(())
}
