use dml_preview::prelude::*;
use dml_preview::{convert, output::from_wire_format};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

fn collapse(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn convert_one(sql: &str, id: &str) -> ConversionRecord {
    let mut records = convert(sql, id).expect("batch should pass preconditions");
    assert_eq!(records.len(), 1);
    records.remove(0)
}

#[test]
fn test_delete_becomes_select_star() {
    let record = convert_one("delete from schema.tbl t where t.id = 1;", "abc");

    assert_eq!(
        record,
        ConversionRecord::converted(
            "select *\nfrom schema.tbl\nwhere t.id = 1;",
            "Delete statement converted successfully."
        )
    );
    assert!(collapse(&record.sql).starts_with("select * from schema.tbl"));
}

#[test]
fn test_delete_without_where_is_invalid() {
    let record = convert_one("delete from schema.tbl;", "abc");

    assert!(record.is_error);
    assert_eq!(record.sql, "delete from schema.tbl;");
    assert_eq!(record.message, MessageKey::DeleteInvalid.default_template());
}

#[test]
fn test_update_selects_assigned_fields() {
    let record = convert_one(
        "update tmp_schema.tbl t set t.a = 1, t.b = 2 where t.id = 1;",
        "abc",
    );

    assert!(!record.is_error);
    assert_eq!(record.sql, "select a, b\nfrom schema.tbl t\nwhere t.id = 1;");
    assert!(collapse(&record.sql).starts_with("select a, b from schema.tbl"));
    assert_eq!(record.message, "Update statement converted successfully.");
}

#[test]
fn test_update_with_subqueries() {
    let record = convert_one(
        "update s.t x set (x.a, x.b) = (select p, q from s.u where u.k = x.k) \
         where x.id in (select id from s.w where w.f = 'y');",
        "abc",
    );

    assert!(!record.is_error, "{}", record.message);
    assert_eq!(
        record.sql,
        "select a, b\nfrom s.t x\nwhere x.id in (select id from s.w where w.f = 'y');"
    );
}

#[test]
fn test_update_without_set_clause() {
    let record = convert_one("update schema.tbl t set t.a = 1;", "abc");

    assert!(record.is_error);
    assert_eq!(record.message, MessageKey::UpdateInvalidSet.default_template());
}

#[test]
fn test_merge_yields_using_subquery() {
    let record = convert_one(
        "merge into schema.tgt t using (select x, y from schema.src where y is not null) s \
         on (t.x = s.x) when matched then update set t.y = s.y;",
        "abc",
    );

    assert!(!record.is_error, "{}", record.message);
    assert_eq!(
        collapse(&record.sql),
        "select x, y from schema.src where y is not null"
    );
    assert_eq!(record.message, "Merge statement converted successfully.");
}

#[test]
fn test_merge_without_matched_clause() {
    let record = convert_one(
        "merge into schema.tgt t using (select x from schema.src where x = 1) s on (t.x = s.x);",
        "abc",
    );

    assert!(record.is_error);
    assert_eq!(
        record.message,
        MessageKey::MergeInvalidMatchedClause.default_template()
    );
}

#[test]
fn test_comparison_is_accepted() {
    let record = convert_one("delete from s.t t where t.status = 'X';", "abc");
    assert!(!record.is_error);
    assert_eq!(record.sql, "select *\nfrom s.t\nwhere t.status = 'X';");
}

#[test]
fn test_unknown_operator_is_rejected_and_marked() {
    let record = convert_one("delete from s.t t where t.status ~~ 'X';", "abc");

    assert_eq!(
        record,
        ConversionRecord::failed(
            "delete from s.t t where [PARAMERROR]t.status ~~ 'X';",
            "Delete statement was not converted."
        )
    );
}

#[test]
fn test_two_where_keywords_are_rejected() {
    let record = convert_one("delete from s.t where a = 1 where b = 2;", "abc");

    assert!(record.is_error);
    assert_eq!(
        record.sql,
        "delete from s.t [PARAMERROR]where a = 1 [PARAMERROR]where b = 2;"
    );
}

#[test]
fn test_nested_predicates_are_checked() {
    let record = convert_one(
        "delete from s.t where a in (select b from s.u where c ~~ 'z') and d = 1;",
        "abc",
    );

    assert!(record.is_error);
    assert_eq!(
        record.sql,
        "delete from s.t where a in (select b from s.u where [PARAMERROR]c ~~ 'z') and d = 1;"
    );
}

#[test]
fn test_identifier_is_injected() {
    let record = convert_one("delete from s.t t where t.entity = :entityid;", " abc ");

    assert!(!record.is_error);
    assert_eq!(
        record.sql,
        "select *\nfrom s.t\nwhere t.entity = toentityid('ABC');"
    );
}

#[test]
fn test_unsupported_statement() {
    let record = convert_one("select 1;", "abc");

    assert_eq!(
        record,
        ConversionRecord::failed(
            "select 1;",
            "Unsupported statement 'select'. Only UPDATE, DELETE and MERGE can be converted."
        )
    );
}

#[test]
fn test_many_literals_survive_conversion() {
    let predicates: Vec<String> = (1..=12).map(|i| format!("t.c{} = 'v{}'", i, i)).collect();
    let sql = format!("delete from s.t t where {};", predicates.join(" and "));

    let record = convert_one(&sql, "abc");

    assert!(!record.is_error, "{}", record.message);
    assert_eq!(
        collapse(&record.sql),
        format!("select * from s.t where {};", predicates.join(" and "))
    );
}

#[test]
fn test_statements_are_independent() {
    let records = convert(
        "delete from s.t where a = 1;\nselect 1;\nupdate s.u set b = 2 where c ~~ 3;\n\
         update s.u set b = 2 where c = 3;",
        "abc",
    )
    .unwrap();

    let errors: Vec<bool> = records.iter().map(|r| r.is_error).collect();
    assert_eq!(errors, vec![false, true, true, false]);
    assert_eq!(records[3].sql, "select b\nfrom s.u\nwhere c = 3;");
}

#[test]
fn test_multiline_input() {
    let record = convert_one(
        "delete from s.t t\r\n where t.a = 1\n   and t.b is null;",
        "abc",
    );

    assert!(!record.is_error);
    assert_eq!(record.sql, "select *\nfrom s.t\nwhere t.a = 1\nand t.b is null;");
}

#[test]
fn test_preconditions_abort_the_batch() {
    assert!(matches!(
        convert("", ""),
        Err(ConvertError::Precondition(PreconditionFailure::MissingSqlAndId))
    ));
    assert!(matches!(
        convert("delete from s.t where a = 1", "abc"),
        Err(ConvertError::Precondition(PreconditionFailure::NoTerminator))
    ));
    assert!(matches!(
        convert("delete from s.t where a = ’1’;", "abc"),
        Err(ConvertError::Precondition(PreconditionFailure::SmartQuote))
    ));
}

#[test]
fn test_timeout_fails_only_the_statement() {
    let config = ConverterConfig::builder()
        .match_timeout(Duration::ZERO)
        .build()
        .unwrap();
    let patterns = Patterns::compile(&config).unwrap();
    let catalog = config.catalog().unwrap();

    let records = Converter::new(
        &patterns,
        &catalog,
        "delete from s.t where a = 1; select 1;",
        "abc",
    )
    .convert()
    .unwrap();

    assert_eq!(
        records[0],
        ConversionRecord::failed(
            "delete from s.t where a = 1;",
            MessageKey::Timeout.default_template()
        )
    );
    assert!(records[1].message.starts_with("Unsupported statement"));
}

#[test]
fn test_configured_messages_and_marker() {
    let config = ConverterConfig::from_toml(
        r#"
        error_marker = ">>"

        [messages]
        not-converted = "{0}: nicht konvertiert"
        successfully-converted = "{0}: ok"
        "#,
    )
    .unwrap();
    let patterns = Patterns::compile(&config).unwrap();
    let catalog = config.catalog().unwrap();

    let records = Converter::new(
        &patterns,
        &catalog,
        "delete from s.t where a ~~ 1; delete from s.t where a = 1;",
        "abc",
    )
    .convert()
    .unwrap();

    assert_eq!(
        records,
        vec![
            ConversionRecord::failed("delete from s.t where >>a ~~ 1;", "Delete: nicht konvertiert"),
            ConversionRecord::converted("select *\nfrom s.t\nwhere a = 1;", "Delete: ok"),
        ]
    );
}

#[test]
fn test_wire_format_round_trip() {
    let records = convert("delete from s.t where a = 'x'; select 1;", "abc").unwrap();
    let bytes = to_wire_format(&records).unwrap();

    let json = String::from_utf8(bytes.clone()).unwrap();
    assert!(json.starts_with(r#"[{"sql":"select *\nfrom s.t\nwhere a = 'x';","isError":false"#));
    assert_eq!(from_wire_format(&bytes).unwrap(), records);
}

#[test]
fn test_unclosed_subqueries_finish_quickly() {
    let sql = format!(
        "delete from s.t where a = 1 and b in {};",
        "(select x ".repeat(10_000)
    );
    let started = Instant::now();

    let record = convert_one(&sql, "abc");

    assert!(record.is_error);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_nested_select_without_where_is_rejected() {
    let record = convert_one("delete from s.t where a in (select b from s.u);", "abc");

    assert_eq!(
        record,
        ConversionRecord::failed(
            "delete from s.t where a in ([PARAMERROR]select b from s.u);",
            "Delete statement was not converted."
        )
    );
}

#[test]
fn test_token_like_column_is_preserved() {
    let record = convert_one("delete from s.t where STR_1 = 'a';", "abc");

    assert!(!record.is_error, "{}", record.message);
    assert_eq!(record.sql, "select *\nfrom s.t\nwhere STR_1 = 'a';");
}

#[test]
fn test_merge_source_with_scalar_subquery() {
    let record = convert_one(
        "merge into s.tgt t using (select (select max(b) from s.x where x.k = a) m, c \
         from s.src where c = 1) s on (t.c = s.c) when matched then delete;",
        "abc",
    );

    assert!(!record.is_error, "{}", record.message);
    assert_eq!(
        collapse(&record.sql),
        "select (select max(b) from s.x where x.k = a) m, c from s.src where c = 1"
    );
}
