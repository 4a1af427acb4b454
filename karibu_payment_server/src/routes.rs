//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are all async: webhook processing is database-bound, and blocking a worker thread would stall
//! every other delivery queued on it.
use actix_web::{get, web, HttpResponse, Responder};
use karibu_payment_engine::{
    gateway_types::PaymentEvent,
    traits::{LedgerManagement, PaymentPipelineDatabase},
    PaymentFlowApi,
    WalletApi,
    WebhookOutcome,
};
use log::*;
use serde_json::Value;

use crate::{data_objects::WebhookAck, errors::ServerError};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

//----------------------------------------------   Health  ----------------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//-------------------------------------------- Payment webhook ------------------------------------------------------

route!(payment_webhook => Post "/webhook/payment" impl PaymentPipelineDatabase);
/// The gateway's webhook endpoint.
///
/// Always answers HTTP 200. An unmatched reference is still a successful acknowledgement (we have nothing to
/// act on and a retry cannot change that); only unparseable payloads and internal errors report
/// `success: false`.
pub async fn payment_webhook<B: PaymentPipelineDatabase>(
    api: web::Data<PaymentFlowApi<B>>,
    body: web::Json<Value>,
) -> HttpResponse {
    let payload = body.into_inner();
    let event = match PaymentEvent::try_from(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!("📬️ Discarding unusable gateway notification. {e}");
            return HttpResponse::Ok().json(WebhookAck::rejected(e.to_string()));
        },
    };
    debug!("📬️ Gateway notification received for [{}]", event.reference);
    match api.handle_gateway_event(event).await {
        Ok(outcome) => {
            let ack = match &outcome {
                WebhookOutcome::UnknownReference { reference } => {
                    debug!("📬️ No payment on record for [{reference}]; acknowledging without action.");
                    WebhookAck::acknowledged(reference.clone(), "unknown")
                },
                WebhookOutcome::Completed { reference, report } => {
                    if !report.is_clean() {
                        warn!(
                            "📬️ Delivery for [{reference}] completed with {} fulfillment warning(s).",
                            report.warnings.len()
                        );
                    }
                    WebhookAck::acknowledged(reference.clone(), "completed")
                },
                WebhookOutcome::Failed { reference, .. } => WebhookAck::acknowledged(reference.clone(), "failed"),
                WebhookOutcome::Ignored { reference, .. } => WebhookAck::acknowledged(reference.clone(), "ignored"),
            };
            HttpResponse::Ok().json(ack)
        },
        Err(e) => {
            // A database error is the one case worth the gateway retrying, but the contract is still a 200;
            // redelivery happens on the gateway's own schedule regardless.
            error!("📬️ Error handling gateway notification. {e}");
            HttpResponse::Ok().json(WebhookAck::rejected("internal error"))
        },
    }
}

//----------------------------------------------   Wallet  ----------------------------------------------------------

route!(wallet => Get "/wallet/{vendor_id}" impl LedgerManagement);
/// Returns the vendor's wallet, projected on the fly from their transaction log.
pub async fn wallet<B: LedgerManagement>(
    api: web::Data<WalletApi<B>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let vendor_id = path.into_inner();
    trace!("💻️ GET wallet for vendor {vendor_id}");
    let summary = api.wallet_summary(&vendor_id).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(wallet_history => Get "/wallet/{vendor_id}/history" impl LedgerManagement);
/// The vendor's full transaction history, oldest first.
pub async fn wallet_history<B: LedgerManagement>(
    api: web::Data<WalletApi<B>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let vendor_id = path.into_inner();
    let history = api.transaction_history(&vendor_id).await?;
    Ok(HttpResponse::Ok().json(history))
}
