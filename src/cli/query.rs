//! Raw request command
//!
//! Sends one REST-style request through the local query layer and prints the
//! JSON response, the way a remote API client would see it.

use clap::Args;
use serde_json::Value;
use tracing::debug;

use crate::error::{InoutError, InoutResult};
use crate::query::Request;

use super::Context;

/// Arguments for `inout query`
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// GET, POST, PUT, PATCH or DELETE
    pub method: String,
    /// Collection name (accounts, categories, transactions, budgets, attachments)
    pub collection: String,
    /// Record ID
    pub id: Option<String>,
    /// Query string, e.g. "type=expense&_sort=date&_order=asc"
    #[arg(short, long)]
    pub query: Option<String>,
    /// JSON request body
    #[arg(short, long)]
    pub body: Option<String>,
}

/// Handle a raw query
pub async fn handle_query_command(ctx: &Context, args: QueryArgs) -> InoutResult<()> {
    let body = args
        .body
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(|e| InoutError::Validation(format!("Invalid JSON body: {}", e)))?;

    let ledger = ctx.ledger();
    let result = match Request::parse(
        &args.collection,
        &args.method,
        args.id.as_deref(),
        args.query.as_deref(),
        body,
    ) {
        Ok(request) => ledger.query().execute(request).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response.into_value())?);
            Ok(())
        }
        Err(e) => {
            debug!(status = %e.status(), "request failed");
            eprintln!("Request failed with status {}", e.status());
            Err(e.into())
        }
    }
}
