use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Marble League sync service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rounds::get_current_round,
        crate::routes::rounds::sync_current_round,
        crate::routes::rounds::get_results,
        crate::routes::rounds::sync_results,
        crate::routes::rounds::set_suspension,
        crate::routes::bets::get_slip,
        crate::routes::bets::add_draft,
        crate::routes::bets::clear_slip,
        crate::routes::bets::remove_draft,
        crate::routes::bets::submit_bets,
        crate::routes::sse::round_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::round::RoundViewResponse,
            crate::dto::round::RoundResultSummary,
            crate::dto::round::ResultsResponse,
            crate::dto::round::SuspensionRequest,
            crate::dto::round::VisibleRoundStatus,
            crate::dto::bets::AddBetRequest,
            crate::dto::bets::BetDraftDto,
            crate::dto::bets::BetSlipResponse,
            crate::dto::bets::SubmitBetsResponse,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::BetsClearedEvent,
            crate::dto::sse::HotBetsClearedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rounds", description = "Round view, results and reconciliation"),
        (name = "bets", description = "Bet slip and submission"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_round_and_bet_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/rounds/current",
            "/rounds/results/sync",
            "/bets/slip/{id}",
            "/sse/rounds",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
