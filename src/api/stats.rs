//! The handler for the aggregated statistics report.

use axum::{Extension, Json, extract::{Query, State}};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    report::{
        YearMonth, all_time_totals, calendar_breakdown, category_breakdown, round2,
        trailing_window_totals,
    },
    transaction::list_transactions_for_report,
    user::UserID,
};

/// The optional query parameters accepted by the stats report.
#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    /// The month for the category breakdown as "YYYY-MM". Defaults to the
    /// most recent month with data.
    pub month: Option<String>,
}

/// Handler for the statistics report over the logged in user's transactions.
///
/// The report contains the all-time totals, the trailing window totals, the
/// per-month calendar breakdown, and the category breakdown for the
/// requested (or most recent) month. All sums are rounded to two decimal
/// places.
///
/// # Errors
///
/// This function will return a:
/// - [Error::InvalidDate] (422) if `month` is not a valid "YYYY-MM" string,
/// - [Error::DatabaseLock] if the database lock could not be acquired,
/// - or [Error::SqlError] if there is an SQL error.
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserID>,
    Query(params): Query<StatsParams>,
) -> Result<Json<Value>, Error> {
    let month = params.month.map(|raw| raw.parse::<YearMonth>()).transpose()?;

    let transactions = {
        let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

        list_transactions_for_report(user_id, &connection)?
    };

    let today = OffsetDateTime::now_utc().date();
    let all_time = all_time_totals(&transactions).rounded();
    let windows: Vec<Value> = trailing_window_totals(&transactions, today)
        .into_iter()
        .map(|window| {
            let totals = window.totals.rounded();
            json!({"days": window.days, "income": totals.income, "spending": totals.spending})
        })
        .collect();

    let mut calendar = Map::new();
    for (year, months) in calendar_breakdown(&transactions) {
        let mut months_object = Map::new();
        for (month_number, totals) in months {
            let totals = totals.rounded();
            months_object.insert(
                format!("{month_number:02}"),
                json!({"income": totals.income, "spending": totals.spending}),
            );
        }
        calendar.insert(year.to_string(), Value::Object(months_object));
    }

    let categories = category_breakdown(&transactions, month);
    let category_totals = |totals: &[crate::report::CategoryTotal]| -> Vec<Value> {
        totals
            .iter()
            .map(|entry| json!({"category": entry.category, "total": round2(entry.total)}))
            .collect()
    };

    Ok(Json(json!({
        "all_time": {"income": all_time.income, "spending": all_time.spending},
        "windows": windows,
        "calendar": calendar,
        "categories": {
            "month": categories.month.map(|month| month.to_string()),
            "income": category_totals(&categories.income),
            "spending": category_totals(&categories.spending),
        },
    })))
}

#[cfg(test)]
mod stats_tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        api::test_utils::{new_test_server, new_test_state, register_and_log_in},
        endpoints,
    };

    async fn add_transaction(server: &axum_test::TestServer, body: Value) {
        server
            .post(endpoints::TRANSACTIONS_API)
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn stats_requires_authentication() {
        let server = new_test_server(new_test_state());

        server
            .get(endpoints::STATS)
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn stats_for_no_data_is_all_zeroes() {
        let server = new_test_server(new_test_state());
        register_and_log_in(&server).await;

        let body: Value = server.get(endpoints::STATS).await.json();

        assert_eq!(body["all_time"], json!({"income": 0.0, "spending": 0.0}));
        assert_eq!(body["windows"].as_array().unwrap().len(), 4);
        assert_eq!(body["calendar"], json!({}));
        assert_eq!(body["categories"]["month"], Value::Null);
        assert_eq!(body["categories"]["income"], json!([]));
        assert_eq!(body["categories"]["spending"], json!([]));
    }

    #[tokio::test]
    async fn stats_aggregates_by_type_month_and_category() {
        let server = new_test_server(new_test_state());
        register_and_log_in(&server).await;
        add_transaction(
            &server,
            json!({"amount": 100.0, "type": "income", "category": "work", "date": "2024-01-15"}),
        )
        .await;
        add_transaction(
            &server,
            json!({"amount": 25.5, "type": "spending", "category": "rent", "date": "2024-01-20"}),
        )
        .await;
        add_transaction(
            &server,
            json!({"amount": 10.0, "type": "spending", "category": "groceries", "date": "2024-02-01"}),
        )
        .await;

        let body: Value = server
            .get(endpoints::STATS)
            .add_query_param("month", "2024-01")
            .await
            .json();

        assert_eq!(body["all_time"], json!({"income": 100.0, "spending": 35.5}));
        assert_eq!(
            body["calendar"]["2024"]["01"],
            json!({"income": 100.0, "spending": 25.5})
        );
        assert_eq!(
            body["calendar"]["2024"]["02"],
            json!({"income": 0.0, "spending": 10.0})
        );
        assert_eq!(body["categories"]["month"], "2024-01");
        assert_eq!(
            body["categories"]["spending"],
            json!([{"category": "rent", "total": 25.5}])
        );
        assert_eq!(
            body["categories"]["income"],
            json!([{"category": "work", "total": 100.0}])
        );
    }

    #[tokio::test]
    async fn stats_rejects_malformed_month() {
        let server = new_test_server(new_test_state());
        register_and_log_in(&server).await;

        server
            .get(endpoints::STATS)
            .add_query_param("month", "2024-13")
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
