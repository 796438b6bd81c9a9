//! The `Categorize` RPC: extraction, scoring and classification of one
//! offer document per call.

use indexmap::IndexMap;
use thiserror::Error;
use tonic::{Request, Response, Status};
use tracing::{error, info, warn};

use crate::categories::Category;
use crate::classifier::{Categorization, TripCategories, classify};
use crate::config::{InvalidInputPolicy, ServiceConfig};
use crate::error::ExtractError;
use crate::extractor::extract_trips;
use crate::output::log_json;
use crate::r2r::categorizer_server::Categorizer;
use crate::r2r::{CategorizationRequest, CategorizationResponse, categorization_response};
use crate::scorer::{FeatureScorer, NormalScorer, RngSource, ScorerError};

/// Stateless categorizer behind the RPC endpoint.
///
/// Nothing survives a call except the generator state in
/// [`SeedMode::Shared`](crate::scorer::SeedMode::Shared).
pub struct CategorizerService {
    scorer: Box<dyn FeatureScorer>,
    rng: RngSource,
    on_invalid_input: InvalidInputPolicy,
}

impl CategorizerService {
    pub fn new(
        scorer: Box<dyn FeatureScorer>,
        rng: RngSource,
        on_invalid_input: InvalidInputPolicy,
    ) -> Self {
        Self {
            scorer,
            rng,
            on_invalid_input,
        }
    }

    /// Builds the service with the placeholder scorer described by `config`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ScorerError> {
        let scorer = NormalScorer::new(config.feature_mean, config.feature_std_dev)?;
        Ok(Self::new(
            Box::new(scorer),
            RngSource::new(config.seed_mode, config.seed),
            config.on_invalid_input,
        ))
    }

    /// Runs the whole pipeline on one offer document.
    #[tracing::instrument(skip_all, fields(offers_len = offers.len()))]
    pub fn categorize_offers(&self, offers: &str) -> Result<Categorization, ExtractError> {
        let trips = extract_trips(offers)?;
        let scores = self.rng.with_rng(|rng| self.scorer.score(&trips, rng));
        let categorization = classify(&scores);

        let categorized = categorization.trips.values().filter(|c| !c.is_empty()).count();
        info!(trips = trips.len(), categorized, "Offer document categorized");
        if let Err(e) = log_json(&categorization) {
            warn!(error = %e, "Failed to render categorization");
        }

        Ok(categorization)
    }
}

#[tonic::async_trait]
impl Categorizer for CategorizerService {
    async fn categorize(
        &self,
        request: Request<CategorizationRequest>,
    ) -> Result<Response<CategorizationResponse>, Status> {
        let request = request.into_inner();

        match self.categorize_offers(&request.offers) {
            Ok(categorization) => Ok(Response::new(categorization.into())),
            Err(err) => match self.on_invalid_input {
                InvalidInputPolicy::Reject => {
                    warn!(error = %err, kind = err.kind(), "Rejecting offer document");
                    Err(err.into())
                }
                InvalidInputPolicy::Exit => {
                    error!(
                        error = %err,
                        exit_code = err.exit_code(),
                        "Invalid offer document, terminating"
                    );
                    std::process::exit(i32::from(err.exit_code()))
                }
            },
        }
    }
}

impl From<Categorization> for CategorizationResponse {
    fn from(categorization: Categorization) -> Self {
        let categorization = categorization
            .trips
            .into_iter()
            .map(|(trip_id, categories)| {
                let categories = categories
                    .into_iter()
                    .map(|(category, score)| (category.name().to_string(), score))
                    .collect();
                (
                    trip_id,
                    categorization_response::Categorization { categories },
                )
            })
            .collect();

        CategorizationResponse { categorization }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category '{0}' in categorization response")]
pub struct UnknownCategory(pub String);

impl TryFrom<CategorizationResponse> for Categorization {
    type Error = UnknownCategory;

    fn try_from(response: CategorizationResponse) -> Result<Self, Self::Error> {
        let mut trips = IndexMap::with_capacity(response.categorization.len());

        for (trip_id, entry) in response.categorization {
            let mut categories = TripCategories::with_capacity(entry.categories.len());
            for (name, score) in entry.categories {
                let category = Category::from_name(&name).ok_or(UnknownCategory(name))?;
                categories.insert(category, score);
            }
            categories.sort_keys();
            trips.insert(trip_id, categories);
        }

        Ok(Categorization { trips })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::CATEGORY_COUNT;
    use crate::extractor::TripMap;
    use crate::scorer::{FeatureScores, SeedMode};
    use prost::Message;
    use rand::RngCore;

    /// Scores every trip with the same fixed features.
    struct FixedScorer([f64; CATEGORY_COUNT]);

    impl FeatureScorer for FixedScorer {
        fn score(&self, trips: &TripMap, _rng: &mut dyn RngCore) -> FeatureScores {
            trips.keys().map(|id| (id.clone(), self.0)).collect()
        }
    }

    const OFFERS: &str = r#"<Trias xmlns="http://www.vdv.de/trias"><ServiceDelivery>
        <TripResult><Trip><TripId>t1</TripId></Trip></TripResult>
        <TripResult><Trip><TripId>t2</TripId></Trip></TripResult>
        <TripResult><Trip><TripId>t1</TripId></Trip></TripResult>
    </ServiceDelivery></Trias>"#;

    fn fixed_service(features: [f64; CATEGORY_COUNT]) -> CategorizerService {
        CategorizerService::new(
            Box::new(FixedScorer(features)),
            RngSource::new(SeedMode::PerCall, 0),
            InvalidInputPolicy::Reject,
        )
    }

    fn default_service() -> CategorizerService {
        CategorizerService::from_config(&ServiceConfig::default()).unwrap()
    }

    #[test]
    fn test_one_entry_per_distinct_trip() {
        let categorization = default_service().categorize_offers(OFFERS).unwrap();
        assert_eq!(categorization.len(), 2);
        assert!(categorization.get("t1").is_some());
        assert!(categorization.get("t2").is_some());
    }

    #[test]
    fn test_per_call_seed_is_reproducible() {
        let service = default_service();
        let first = service.categorize_offers(OFFERS).unwrap();
        let second = service.categorize_offers(OFFERS).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_retained_score_passes_threshold() {
        let categorization = default_service().categorize_offers(OFFERS).unwrap();
        for categories in categorization.trips.values() {
            for (category, score) in categories {
                // rounding may move a passing score down by at most half a unit
                assert!(*score >= category.threshold() - 0.0005);
            }
        }
    }

    #[test]
    fn test_pluggable_scorer() {
        let mut features = [0.0; CATEGORY_COUNT];
        features[Category::Cheap.index()] = 0.9;
        let categorization = fixed_service(features).categorize_offers(OFFERS).unwrap();

        for categories in categorization.trips.values() {
            assert_eq!(categories.len(), 1);
            assert_eq!(categories[&Category::Cheap], 0.9);
        }
    }

    #[test]
    fn test_negative_std_dev_fails_startup() {
        let config = ServiceConfig::from_json(r#"{"feature_std_dev": -1}"#).unwrap();
        assert!(matches!(
            CategorizerService::from_config(&config),
            Err(ScorerError::InvalidStdDev(_))
        ));
    }

    #[test]
    fn test_extraction_errors_propagate() {
        let service = default_service();
        assert_eq!(service.categorize_offers(""), Err(ExtractError::EmptyTree));
        assert_eq!(
            service.categorize_offers(r#"<Trias xmlns="http://www.vdv.de/trias"/>"#),
            Err(ExtractError::InvalidData)
        );
    }

    #[tokio::test]
    async fn test_rpc_returns_categorization() {
        let service = fixed_service([1.0; CATEGORY_COUNT]);
        let response = service
            .categorize(Request::new(CategorizationRequest {
                offers: OFFERS.to_string(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.categorization.len(), 2);
        let t2 = &response.categorization["t2"];
        assert_eq!(t2.categories.len(), CATEGORY_COUNT);
        assert_eq!(t2.categories["Door-to-door"], 1.0);
    }

    #[tokio::test]
    async fn test_rpc_keeps_uncategorized_trips() {
        let service = fixed_service([0.0; CATEGORY_COUNT]);
        let response = service
            .categorize(Request::new(CategorizationRequest {
                offers: OFFERS.to_string(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.categorization.len(), 2);
        assert!(response.categorization["t1"].categories.is_empty());
    }

    #[tokio::test]
    async fn test_rpc_rejects_invalid_documents() {
        let service = default_service();

        let status = service
            .categorize(Request::new(CategorizationRequest {
                offers: String::new(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert!(status.message().contains("EmptyTreeError"));

        let status = service
            .categorize(Request::new(CategorizationRequest {
                offers: "<Trias xmlns=\"http://www.vdv.de/trias\"><Other/></Trias>".to_string(),
            }))
            .await
            .unwrap_err();
        assert!(status.message().contains("InvalidDataError"));
    }

    #[test]
    fn test_response_wire_round_trip() {
        let categorization = default_service().categorize_offers(OFFERS).unwrap();

        let response = CategorizationResponse::from(categorization.clone());
        let bytes = response.encode_to_vec();
        let decoded = CategorizationResponse::decode(bytes.as_slice()).unwrap();

        assert_eq!(Categorization::try_from(decoded).unwrap(), categorization);
    }

    #[test]
    fn test_unknown_category_in_response() {
        let mut response = CategorizationResponse::default();
        response.categorization.insert(
            "t".to_string(),
            categorization_response::Categorization {
                categories: [("Fast".to_string(), 0.5)].into_iter().collect(),
            },
        );

        assert_eq!(
            Categorization::try_from(response),
            Err(UnknownCategory("Fast".to_string()))
        );
    }
}
