use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::channel::{Channel, GatewayEvent};
use crate::courier::{RoutePlayer, RoutePlayerConfig, load_route};
use crate::env::Env;
use crate::error::{ApiError, TrackError};
use crate::i18n;
use crate::order::{OrderStatus, format_kwd};
use crate::tracking::{TrackingSession, render, render_not_found};

/// How often the tracking panel is redrawn between events.
const REDRAW_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid order number: {value:?}. Order numbers must not be empty")]
    InvalidOrderNumber { value: String },
    #[error("Order {order_number} is not assigned to this courier")]
    OrderNotAssigned { order_number: String },
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track an order live in the terminal
    Track {
        /// Order number from the confirmation page (e.g. ORD-1001)
        order_number: String,
    },
    /// List your orders
    Orders {
        /// Page to fetch
        #[arg(long, default_value = "1")]
        page: u32,
        /// Orders per page
        #[arg(long, default_value = "10")]
        limit: u32,
    },
    /// Replay a recorded courier route against the gateway
    Courier {
        /// JSON file with the ordered route points
        #[arg(long)]
        route: PathBuf,
        /// Order the pings belong to
        #[arg(long)]
        order_number: String,
        /// Courier id to announce on the gateway
        #[arg(long)]
        courier_id: String,
        /// Mark the order out for delivery before replaying
        #[arg(long, default_value = "false")]
        mark_out_for_delivery: bool,
        /// Mark the order delivered after the route completes
        #[arg(long, default_value = "false")]
        mark_delivered: bool,
    },
}

#[derive(Debug, Parser)]
#[command(name = "maison-track")]
#[command(about = "Track storefront deliveries live from the terminal")]
#[command(version)]
pub struct CliEnv {
    #[clap(flatten)]
    pub env: Env,
    #[command(subcommand)]
    pub command: Commands,
}

impl CliEnv {
    /// Parse CLI arguments and convert to internal Env struct
    pub fn parse_and_convert() -> anyhow::Result<(Env, Commands)> {
        let cli_env = Self::parse();
        Ok((cli_env.env, cli_env.command))
    }
}

fn validate_order_number(value: &str) -> Result<String, CliError> {
    let order_number = value.trim();
    if order_number.is_empty() {
        return Err(CliError::InvalidOrderNumber {
            value: value.to_string(),
        });
    }
    Ok(order_number.to_string())
}

pub async fn run_command(env: Env, command: Commands) -> anyhow::Result<()> {
    run_command_with_writers(env, command, &mut std::io::stdout()).await
}

async fn run_command_with_writers<W: Write>(
    env: Env,
    command: Commands,
    stdout: &mut W,
) -> anyhow::Result<()> {
    match command {
        Commands::Track { order_number } => {
            let order_number = validate_order_number(&order_number)?;
            info!("Tracking order {order_number}");
            track_command_with_writers(&env, &order_number, stdout).await?;
        }
        Commands::Orders { page, limit } => {
            info!("Listing orders: page={page}, limit={limit}");
            orders_command_with_writers(&env, page, limit, stdout).await?;
        }
        Commands::Courier {
            route,
            order_number,
            courier_id,
            mark_out_for_delivery,
            mark_delivered,
        } => {
            let order_number = validate_order_number(&order_number)?;
            info!("Replaying courier route for {order_number}");
            courier_command_with_writers(
                &env,
                &route,
                &order_number,
                &courier_id,
                mark_out_for_delivery,
                mark_delivered,
                stdout,
            )
            .await?;
        }
    }

    info!("CLI operation completed successfully");
    Ok(())
}

async fn track_command_with_writers<W: Write>(
    env: &Env,
    order_number: &str,
    stdout: &mut W,
) -> anyhow::Result<()> {
    let api = env.api_client();
    let channel = env.connect_channel().await?;

    writeln!(stdout, "{}", i18n::translate(env.locale, "loading_tracking"))?;

    let mut session =
        match TrackingSession::start(&api, channel.clone(), order_number, env.locale).await {
            Ok(session) => session,
            Err(TrackError::Api(ApiError::NotFound { .. })) => {
                writeln!(stdout, "{}", render_not_found(env.locale, order_number))?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

    let mut events = channel.subscribe();
    let shutdown_rx = spawn_shutdown_listener();

    track_loop(&mut session, &mut events, shutdown_rx, stdout).await?;
    session.stop().await?;
    Ok(())
}

/// Fold gateway events into the session and redraw the panel about once a
/// second, until the order reaches a terminal status or shutdown is
/// requested.
async fn track_loop<W: Write>(
    session: &mut TrackingSession,
    events: &mut broadcast::Receiver<GatewayEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
    stdout: &mut W,
) -> anyhow::Result<()> {
    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => session.apply(&event, Instant::now()),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Dropped {skipped} gateway events; panel may skip frames");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = redraw.tick() => {
                writeln!(stdout, "{}\n", render(&session.view(Instant::now())))?;
                if session.order().status.is_terminal() {
                    info!(
                        "Order {} reached terminal status {}",
                        session.order().order_number,
                        session.order().status
                    );
                    break;
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }

    Ok(())
}

async fn orders_command_with_writers<W: Write>(
    env: &Env,
    page: u32,
    limit: u32,
    stdout: &mut W,
) -> anyhow::Result<()> {
    let api = env.api_client();
    let orders = api.my_orders(page, limit).await?;

    if orders.is_empty() {
        writeln!(stdout, "{}", i18n::translate(env.locale, "no_order_found"))?;
        return Ok(());
    }

    for order in orders {
        let mut line = format!(
            "{}  {}  {}",
            order.order_number,
            i18n::status_label(env.locale, &order.status),
            format_kwd(order.total())
        );
        if let Some(created_at) = order.created_at {
            line.push_str(&format!("  {}", created_at.format("%Y-%m-%d %H:%M")));
        }
        writeln!(stdout, "{line}")?;
    }
    Ok(())
}

async fn courier_command_with_writers<W: Write>(
    env: &Env,
    route_path: &Path,
    order_number: &str,
    courier_id: &str,
    mark_out_for_delivery: bool,
    mark_delivered: bool,
    stdout: &mut W,
) -> anyhow::Result<()> {
    let route = load_route(route_path)?;
    let route_len = route.len();
    let api = env.api_client();
    let channel = env.connect_channel().await?;

    if mark_out_for_delivery {
        let order_id = find_assigned_order(&api, order_number).await?;
        api.update_order_status(&order_id, &OrderStatus::OutForDelivery)
            .await?;
        writeln!(stdout, "✅ {order_number} marked out for delivery")?;
    }

    let player = RoutePlayer::new(
        RoutePlayerConfig {
            order_number: order_number.to_string(),
            courier_id: courier_id.to_string(),
            ping_interval: env.get_replay_interval(),
        },
        channel,
        route,
        spawn_shutdown_listener(),
    );
    let published = player.run().await?;
    writeln!(
        stdout,
        "✅ Published {published} location updates for {order_number}"
    )?;

    if mark_delivered {
        if published == route_len {
            let order_id = find_assigned_order(&api, order_number).await?;
            api.update_order_status(&order_id, &OrderStatus::Delivered)
                .await?;
            writeln!(stdout, "✅ {order_number} marked delivered")?;
        } else {
            writeln!(
                stdout,
                "❌ Replay was interrupted, leaving {order_number} undelivered"
            )?;
        }
    }
    Ok(())
}

/// Resolve the backend id of an order assigned to the authenticated courier.
async fn find_assigned_order(api: &ApiClient, order_number: &str) -> anyhow::Result<String> {
    let orders = api.assigned_orders().await?;
    orders
        .into_iter()
        .find(|order| order.order_number == order_number)
        .and_then(|order| order.id)
        .ok_or_else(|| {
            CliError::OrderNotAssigned {
                order_number: order_number.to_string(),
            }
            .into()
        })
}

fn spawn_shutdown_listener() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });
    shutdown_rx
}
