use pnl_config::load_layered_yaml_from_strings;

#[test]
fn hash_ignores_key_order_and_layer_formatting() {
    let a = load_layered_yaml_from_strings(&[
        "database:\n  host: db1\n  port: 5432\n",
        "output:\n  realized_table: rp\n",
    ])
    .unwrap();
    let b = load_layered_yaml_from_strings(&[
        "output: { realized_table: rp }\n",
        "database: { port: 5432, host: db1 }\n",
    ])
    .unwrap();

    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn later_layer_overrides_earlier() {
    let loaded = load_layered_yaml_from_strings(&[
        "prices:\n  table: stock_data\n  price_col: last_price\n",
        "prices:\n  table: stock_data_eod\n",
    ])
    .unwrap();

    assert_eq!(loaded.config_json["prices"]["table"], "stock_data_eod");
    assert_eq!(loaded.config_json["prices"]["price_col"], "last_price");
}

#[test]
fn empty_layer_is_a_no_op() {
    let base = load_layered_yaml_from_strings(&["fx_rates:\n  rate_col: rate\n"]).unwrap();
    let with_empty = load_layered_yaml_from_strings(&["fx_rates:\n  rate_col: rate\n", ""]).unwrap();
    assert_eq!(base.config_hash, with_empty.config_hash);
}
