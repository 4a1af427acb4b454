use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use karibu_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    sqlite::db::run_migrations,
    PaymentFlowApi,
    SqliteDatabase,
    WalletApi,
};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    notify::WebhookNotifier,
    routes::{health, PaymentWebhookRoute, WalletHistoryRoute, WalletRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.auto_migrate {
        run_migrations(db.pool())
            .await
            .map_err(|e| ServerError::InitializeError(format!("Could not run database migrations. {e}")))?;
    }
    let producers = start_notification_handlers(&config)?;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wires the outbound notifier into the engine's event hooks and starts the handler tasks.
///
/// Must be called from within the actix runtime. The returned producers are cloned into every worker's
/// `PaymentFlowApi`, so one handler task serves all workers.
pub fn start_notification_handlers(config: &ServerConfig) -> Result<EventProducers, ServerError> {
    let notifier = WebhookNotifier::new(&config.notify)?;
    let mut hooks = EventHooks::default();
    if notifier.is_enabled() {
        let on_completed = notifier.clone();
        hooks.on_payment_completed(move |event| {
            let notifier = on_completed.clone();
            Box::pin(async move {
                let message = format!(
                    "Payment [{}] completed: {} {} received for order {}.",
                    event.reference,
                    event.currency,
                    event.amount.value(),
                    event.order_id
                );
                info!("📡️ {message} Notifying subscribers.");
                notifier.notify("payment.completed", &message, &event).await;
            })
        });
        let on_failed = notifier.clone();
        hooks.on_payment_failed(move |event| {
            let notifier = on_failed.clone();
            Box::pin(async move {
                let message =
                    format!("Payment [{}] failed (gateway status: {}).", event.reference, event.gateway_status);
                info!("📡️ {message} Notifying subscribers.");
                notifier.notify("payment.failed", &message, &event).await;
            })
        });
    }
    let handlers = EventHandlers::new(100, hooks);
    let producers = handlers.producers();
    tokio::spawn(handlers.start_handlers());
    Ok(producers)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let flow_api = PaymentFlowApi::new(db.clone(), producers.clone());
        let wallet_api = WalletApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("kps::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(wallet_api))
            .service(health)
            .service(PaymentWebhookRoute::<SqliteDatabase>::new())
            .service(WalletHistoryRoute::<SqliteDatabase>::new())
            .service(WalletRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
