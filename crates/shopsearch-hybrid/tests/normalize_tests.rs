use serde_json::json;
use shopsearch_core::error::BackendError;
use shopsearch_core::DisplayValue;
use shopsearch_hybrid::normalize::parse_hits;

fn one(source: serde_json::Value) -> serde_json::Value {
    json!({ "hits": { "hits": [ { "_id": "B07", "_score": 4.5, "_source": source } ] } })
}

#[test]
fn missing_optional_fields_become_placeholders() {
    let hits = parse_hits(one(json!({ "product_name": "Magna-Tiles 32 Piece Set" }))).expect("parse");
    let hit = &hits[0];
    assert_eq!(hit.id, "B07");
    assert_eq!(hit.score, 4.5);
    assert_eq!(hit.name, "Magna-Tiles 32 Piece Set");
    assert_eq!(hit.price, 0.0);
    assert_eq!(hit.brand, DisplayValue::NotAvailable);
    assert_eq!(hit.category, DisplayValue::NotAvailable);
    assert_eq!(hit.image, DisplayValue::NotAvailable);
}

#[test]
fn nan_and_blank_text_are_not_available() {
    let hits = parse_hits(one(json!({
        "product_name": "Rubik's Cube",
        "brand": "nan",
        "category": "   ",
        "image_url": null,
        "price": null
    })))
    .expect("parse");
    assert_eq!(hits[0].brand, DisplayValue::NotAvailable);
    assert_eq!(hits[0].category, DisplayValue::NotAvailable);
    assert_eq!(hits[0].image, DisplayValue::NotAvailable);
    assert_eq!(hits[0].price, 0.0);
}

#[test]
fn string_prices_are_parsed_and_garbage_is_zero() {
    let hits = parse_hits(one(json!({ "product_name": "Lego", "price": "$1,299.50" }))).expect("parse");
    assert_eq!(hits[0].price, 1299.5);
    let hits = parse_hits(one(json!({ "product_name": "Lego", "price": "call for price" }))).expect("parse");
    assert_eq!(hits[0].price, 0.0);
}

#[test]
fn full_category_text_is_preserved() {
    let category = "Toys & Games | Building Toys | Building Sets | Construction Kits For Older Kids";
    let hits = parse_hits(one(json!({ "product_name": "Lego", "category": category }))).expect("parse");
    assert_eq!(hits[0].category, DisplayValue::Available(category.to_string()));
}

#[test]
fn required_fields_missing_is_malformed() {
    let cases = [
        json!({ "hits": { "hits": [ { "_score": 1.0, "_source": { "product_name": "x" } } ] } }),
        json!({ "hits": { "hits": [ { "_id": "a", "_source": { "product_name": "x" } } ] } }),
        json!({ "hits": { "hits": [ { "_id": "a", "_score": 1.0 } ] } }),
        json!({ "hits": { "hits": [ { "_id": "a", "_score": 1.0, "_source": { "brand": "x" } } ] } }),
        json!({ "hits": { "hits": [ { "_id": "a", "_score": 1.0, "_source": { "product_name": 7 } } ] } }),
        json!({ "hits": { "hits": [ { "_id": "a", "_score": 1.0, "_source": { "product_name": "x", "brand": ["x"] } } ] } }),
    ];
    for case in cases {
        let err = parse_hits(case.clone()).expect_err("malformed");
        assert!(matches!(err, BackendError::Malformed(_)), "{case}: {err}");
    }
}

#[test]
fn bad_envelope_is_malformed_and_empty_hits_are_fine() {
    for bad in [json!({}), json!({ "hits": [] }), json!("oops"), json!({ "hits": { "total": 0 } })] {
        assert!(matches!(parse_hits(bad), Err(BackendError::Malformed(_))));
    }
    let hits = parse_hits(json!({ "hits": { "hits": [] } })).expect("empty is valid");
    assert!(hits.is_empty());
}

#[test]
fn timed_out_or_shard_failures_are_partial_not_success() {
    let hit = json!([{ "_id": "a", "_score": 1.0, "_source": { "product_name": "x" } }]);
    let timed_out = json!({ "timed_out": true, "_shards": { "total": 5, "successful": 5, "failed": 0 }, "hits": { "hits": hit.clone() } });
    let lost_shards = json!({ "timed_out": false, "_shards": { "total": 5, "successful": 1, "failed": 4 }, "hits": { "hits": hit.clone() } });
    for response in [timed_out, lost_shards] {
        let err = parse_hits(response.clone()).expect_err("partial");
        assert!(matches!(err, BackendError::Partial(_)), "{response}: {err}");
    }

    let healthy = json!({ "timed_out": false, "_shards": { "total": 5, "successful": 5, "failed": 0 }, "hits": { "hits": hit.clone() } });
    assert_eq!(parse_hits(healthy).expect("healthy").len(), 1);
}

#[test]
fn blank_product_name_is_kept_not_malformed() {
    let hits = parse_hits(one(json!({ "product_name": "  " }))).expect("string name is enough");
    assert_eq!(hits[0].name, "  ");
}

#[test]
fn order_is_preserved() {
    let response = json!({ "hits": { "hits": [
        { "_id": "low", "_score": 0.1, "_source": { "product_name": "a" } },
        { "_id": "high", "_score": 9.0, "_source": { "product_name": "b" } }
    ] } });
    let hits = parse_hits(response).expect("parse");
    assert_eq!(hits.iter().map(|h| h.id.as_str()).collect::<Vec<_>>(), vec!["low", "high"]);
}
