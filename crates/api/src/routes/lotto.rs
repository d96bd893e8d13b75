//! Lottery Routes

use axum::{extract::Query, Json};
use lotto::LottoDraw;
use serde::Deserialize;

/// Query parameters for the lotto endpoint
#[derive(Debug, Deserialize)]
pub struct LottoQuery {
    /// Also draw a bonus number
    #[serde(default)]
    pub bonus: bool,
}

/// Draw one set of numbers
pub async fn get_lotto(Query(params): Query<LottoQuery>) -> Json<LottoDraw> {
    let draw = if params.bonus {
        lotto::predict_with_bonus()
    } else {
        lotto::predict()
    };
    metrics::counter!("lotto_draws_total").increment(1);

    Json(draw)
}
