use std::collections::HashMap;

use pnl_config::{load_layered_yaml_from_strings, Settings};

#[test]
fn yaml_layers_then_env_resolve_into_settings() {
    let loaded = load_layered_yaml_from_strings(&[
        "database:\n  host: yaml-db\n  max_connections: 3\ntransactions:\n  table: trades\n",
        "transactions:\n  fx_col: fx_rate\n",
    ])
    .unwrap();

    let env: HashMap<&str, &str> = [
        ("PNL_DATABASE_URL", "postgres://localhost/pnl_test"),
        ("EQUITY_TRANSACTIONS_TABLE", "equity_transactions_v2"),
    ]
    .into();
    let s = Settings::resolve(&loaded.config_json, &|k| env.get(k).map(|v| v.to_string())).unwrap();

    assert_eq!(s.database.url.as_deref(), Some("postgres://localhost/pnl_test"));
    assert_eq!(s.database.host, "yaml-db");
    assert_eq!(s.database.max_connections, 3);
    assert_eq!(s.transactions.table, "equity_transactions_v2");
    assert_eq!(s.transactions.fx_col, "fx_rate");
    assert_eq!(s.transactions.date_col, "transaction_date");
}

#[test]
fn bad_identifier_from_yaml_is_rejected() {
    let loaded =
        load_layered_yaml_from_strings(&["fx_rates:\n  table: \"fx_data; drop table x\"\n"]).unwrap();
    let err = Settings::resolve(&loaded.config_json, &|_| None).unwrap_err();
    assert!(err.to_string().contains("CONFIG_BAD_IDENTIFIER field=fx_rates.table"));
}
