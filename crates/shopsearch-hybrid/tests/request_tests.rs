use pretty_assertions::assert_eq;
use serde_json::json;
use shopsearch_core::config::Settings;
use shopsearch_core::{EmbeddingVector, Query, Strategy};
use shopsearch_hybrid::request::{CandidateRequest, RequestPlanner, SOURCE_FIELDS};

fn query(text: &str, k: usize, strategy: Strategy) -> Query {
    Query::new(text, k, strategy, &(1..=100)).expect("valid query")
}

fn vector() -> EmbeddingVector { EmbeddingVector::checked(vec![0.5, -0.25, 0.125], 3).expect("vector") }

#[test]
fn candidate_pool_always_exceeds_k() {
    let settings = Settings::default();
    let planner = RequestPlanner::new(&settings);
    for k in 1..=100 {
        let pool = planner.candidate_pool(k);
        assert!(pool > k, "k={k} pool={pool}");
        assert!(pool <= settings.vector.candidate_ceiling.max(k + 1));
    }
    assert_eq!(planner.candidate_pool(5), 50);
    assert_eq!(planner.candidate_pool(100), 1000);
}

#[test]
fn candidate_pool_respects_ceiling_but_not_below_k_plus_one() {
    let mut settings = Settings::default();
    settings.vector.candidate_ceiling = 120;
    let planner = RequestPlanner::new(&settings);
    assert_eq!(planner.candidate_pool(5), 50);
    assert_eq!(planner.candidate_pool(20), 120);

    settings.vector.candidate_ceiling = 100;
    settings.vector.candidate_multiplier = 1;
    let planner = RequestPlanner::new(&settings);
    assert_eq!(planner.candidate_pool(100), 101);
}

#[test]
fn windows_cover_k_and_rerank_stays_inside_fusion() {
    let mut settings = Settings::default();
    settings.fusion.window = 30;
    settings.rerank.window = 20;
    let planner = RequestPlanner::new(&settings);
    for k in 1..=100 {
        let fusion = planner.fusion_window(k);
        let rerank = planner.rerank_window(k);
        assert!(fusion >= k);
        assert!(rerank >= k && rerank <= fusion, "k={k} rerank={rerank} fusion={fusion}");
    }
    assert_eq!(planner.fusion_window(5), 30);
    assert_eq!(planner.rerank_window(5), 20);
    assert_eq!(planner.rerank_window(25), 25);
    assert_eq!(planner.fusion_window(64), 64);
}

#[test]
fn lexical_body_matches_expected_dsl() {
    let settings = Settings::default();
    let planner = RequestPlanner::new(&settings);
    let body = planner.lexical_request(&query("  Hot Wheels  ", 5, Strategy::Lexical)).to_body(5);
    assert_eq!(
        body,
        json!({
            "size": 5,
            "_source": ["product_name", "brand", "price", "category", "image_url"],
            "query": {
                "multi_match": {
                    "query": "Hot Wheels",
                    "fields": ["product_name^3", "brand^2", "category^1.5", "document_text^1"],
                    "type": "best_fields"
                }
            }
        })
    );
}

#[test]
fn custom_boosts_render_in_field_list() {
    let mut settings = Settings::default();
    settings.search.boosts.brand = 4.0;
    settings.search.boosts.document_text = 0.5;
    let planner = RequestPlanner::new(&settings);
    let clause = planner.lexical_clause(&query("lego", 5, Strategy::Lexical));
    assert_eq!(clause.boosted_fields(), vec!["product_name^3", "brand^4", "category^1.5", "document_text^0.5"]);
}

#[test]
fn rank_constant_is_sent_only_when_configured() {
    let mut settings = Settings::default();
    let planner = RequestPlanner::new(&settings);
    let body = planner.hybrid_request(&query("lego", 5, Strategy::HybridFused), vector()).to_body(5);
    let rrf = &body["retriever"]["rrf"];
    assert!(rrf.get("rank_constant").is_none());
    assert_eq!(rrf["rank_window_size"], json!(100));

    settings.fusion.rank_constant = Some(20);
    let planner = RequestPlanner::new(&settings);
    let body = planner.hybrid_request(&query("lego", 5, Strategy::HybridFused), vector()).to_body(5);
    assert_eq!(body["retriever"]["rrf"]["rank_constant"], json!(20));
}

#[test]
fn hybrid_knn_leg_asks_for_at_least_k_neighbours() {
    let settings = Settings::default();
    let planner = RequestPlanner::new(&settings);
    let body = planner.hybrid_request(&query("lego", 80, Strategy::HybridFused), vector()).to_body(80);
    let knn = &body["retriever"]["rrf"]["retrievers"][1]["knn"];
    assert_eq!(knn["k"], json!(80));
    assert_eq!(knn["num_candidates"], json!(800));
    assert_eq!(knn["query_vector"], json!([0.5, -0.25, 0.125]));
}

#[test]
fn full_pipeline_nests_rrf_inside_reranker() {
    let settings = Settings::default();
    let planner = RequestPlanner::new(&settings);
    let q = query("Pokemon plush", 5, Strategy::FullPipeline);
    let request = planner.full_pipeline_request(&q, vector());
    assert_eq!(request.strategy(), Strategy::FullPipeline);

    let body = request.to_body(5);
    assert_eq!(body["_source"], json!(SOURCE_FIELDS));
    let reranker = &body["retriever"]["text_similarity_reranker"];
    assert_eq!(reranker["rank_window_size"], json!(50));
    assert_eq!(reranker["inference_text"], json!("Pokemon plush"));
    assert_eq!(reranker["retriever"], planner.hybrid_request(&q, vector()).to_body(5)["retriever"]);
}

#[test]
fn client_fusion_legs_share_the_window() {
    let settings = Settings::default();
    let planner = RequestPlanner::new(&settings);
    let (lexical, knn, window) = planner.client_fusion_requests(&query("lego", 5, Strategy::HybridFused), vector());
    assert_eq!(window, 100);
    assert!(matches!(lexical, CandidateRequest::Lexical(_)));
    match knn {
        CandidateRequest::Vector(clause) => {
            assert_eq!(clause.k, 100);
            assert_eq!(clause.num_candidates, 1000);
        }
        other => panic!("unexpected leg {other:?}"),
    }
}
