use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use stockwatch_core::error::StockwatchError;

use super::{ApiError, ApiResult};
use crate::app_state::AppState;
use crate::provider::{Bar, Dividend, Interval, OptionContract, Period};

#[derive(Serialize)]
pub struct Price {
    pub ticker: String,
    pub current_price: f64,
    pub volume: u64,
    pub date: String,
}

pub async fn price(State(state): State<AppState>, Path(ticker): Path<String>) -> ApiResult<Price> {
    state.metrics().track_symbol_request(&ticker);

    let bars = state
        .provider()
        .history(&ticker, Period::D1, Interval::parse("1d")?)
        .await?;
    let last = bars
        .last()
        .ok_or_else(|| StockwatchError::NotFound(format!("no price data for ticker {ticker}")))?;

    Ok(Json(Price {
        current_price: last.close,
        volume: last.volume,
        date: last.date.clone(),
        ticker,
    }))
}

#[derive(Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_period")]
    pub period: String,
}

fn default_interval() -> String {
    "1d".into()
}

fn default_period() -> String {
    "1mo".into()
}

#[derive(Serialize)]
pub struct History {
    pub ticker: String,
    pub interval: String,
    pub period: String,
    pub data_points: usize,
    pub history: Vec<Bar>,
}

pub async fn historical(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<History> {
    state.metrics().track_symbol_request(&ticker);

    let Query(params) = params.map_err(bad_query)?;
    let period = Period::parse(&params.period)?;
    let interval = Interval::parse(&params.interval)?;

    let bars = state.provider().history(&ticker, period, interval).await?;
    if bars.is_empty() {
        return Err(StockwatchError::NotFound(format!("no data found for ticker {ticker}")).into());
    }

    Ok(Json(History {
        ticker,
        interval: params.interval,
        period: params.period,
        data_points: bars.len(),
        history: bars,
    }))
}

#[derive(Deserialize)]
pub struct OptionsParams {
    pub date: Option<String>,
}

/// Either the list of expirations or one chain.
#[derive(Serialize)]
#[serde(untagged)]
pub enum Options {
    Dates {
        ticker: String,
        options_dates: Vec<String>,
    },
    Chain {
        ticker: String,
        expiration: String,
        calls: Vec<OptionContract>,
        puts: Vec<OptionContract>,
    },
}

pub async fn options(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    params: Result<Query<OptionsParams>, QueryRejection>,
) -> ApiResult<Options> {
    state.metrics().track_symbol_request(&ticker);

    let Query(params) = params.map_err(bad_query)?;
    let provider = state.provider();

    let Some(date) = params.date else {
        let options_dates = provider.option_expirations(&ticker).await?;
        return Ok(Json(Options::Dates {
            ticker,
            options_dates,
        }));
    };

    let chain = provider.option_chain(&ticker, &date).await?;
    if chain.calls.is_empty() && chain.puts.is_empty() {
        return Err(StockwatchError::NotFound(format!(
            "no options data found for {ticker} on {date}"
        ))
        .into());
    }

    Ok(Json(Options::Chain {
        ticker,
        expiration: chain.expiration,
        calls: chain.calls,
        puts: chain.puts,
    }))
}

#[derive(Serialize)]
pub struct Dividends {
    pub ticker: String,
    pub dividends: Vec<Dividend>,
}

pub async fn dividends(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> ApiResult<Dividends> {
    state.metrics().track_symbol_request(&ticker);

    let dividends = state.provider().dividends(&ticker).await?;
    Ok(Json(Dividends { ticker, dividends }))
}

fn bad_query(e: QueryRejection) -> ApiError {
    StockwatchError::BadRequest(e.body_text()).into()
}
