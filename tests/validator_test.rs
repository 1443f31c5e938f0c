mod common;

use common::shop_schema;
use nl2sql_crafter::validation::{SqlDialect, SqlValidator, ValidatorOptions};
use nl2sql_crafter::Violation;

fn validator() -> SqlValidator {
    SqlValidator::default()
}

#[test]
fn test_valid_queries_over_shop_schema() {
    let schema = shop_schema();
    let queries = [
        "SELECT name, email FROM users WHERE email IS NOT NULL",
        "SELECT o.id, i.product, i.quantity FROM orders o JOIN order_items i ON i.order_id = o.id WHERE i.quantity >= 2",
        "SELECT status, COUNT(*) AS n, AVG(total) FROM orders GROUP BY status HAVING COUNT(*) > 1 ORDER BY n",
        "WITH recent(uid, placed) AS (SELECT user_id, placed_at FROM orders WHERE placed_at > '2024-01-01') SELECT u.name FROM users u JOIN recent r ON r.uid = u.id",
        "SELECT name FROM users WHERE id IN (SELECT user_id FROM orders WHERE total > 100)",
        "SELECT u.name, (SELECT MAX(o.total) FROM orders o WHERE o.user_id = u.id) AS biggest FROM users u",
        "SELECT CASE WHEN total > 100 THEN 'big' ELSE 'small' END AS size FROM orders",
        "SELECT users.name FROM users WHERE users.created_at BETWEEN '2024-01-01' AND '2024-12-31'",
        "SELECT x.product FROM (SELECT product, SUM(quantity) AS q FROM order_items GROUP BY product) AS x WHERE x.q > 10",
        "SELECT DISTINCT status FROM orders WHERE status <> 'cancelled' AND total = -5",
    ];
    for sql in queries {
        let outcome = validator().validate(sql, &schema);
        assert!(outcome.is_valid(), "{} -> {:?}", sql, outcome);
    }
}

#[test]
fn test_collects_every_violation() {
    let outcome = validator().validate(
        "SELECT u.nickname, g.id FROM users u JOIN ghost g ON g.user_id = u.id WHERE u.name = 42",
        &shop_schema(),
    );
    let violations = outcome.violations();
    assert!(violations.contains(&Violation::UnknownColumn {
        column: "nickname".to_string(),
        table: Some("users".to_string()),
    }));
    assert!(violations.contains(&Violation::unknown_table("ghost")));
    assert!(violations.iter().any(|v| v.kind() == "type_mismatch"));
    // Columns of an unknown table are not reported on top of the table itself.
    assert_eq!(violations.len(), 3, "{:?}", violations);
}

#[test]
fn test_alias_not_visible_in_where() {
    let outcome = validator().validate(
        "SELECT total AS amount FROM orders WHERE amount > 10",
        &shop_schema(),
    );
    assert_eq!(outcome.violations(), &[Violation::unknown_column("amount")]);
}

#[test]
fn test_subquery_scope_does_not_leak_out() {
    let outcome = validator().validate(
        "SELECT product FROM orders WHERE id IN (SELECT order_id FROM order_items)",
        &shop_schema(),
    );
    assert_eq!(outcome.violations(), &[Violation::unknown_column("product")]);
}

#[test]
fn test_insert_checks_columns_and_types() {
    let validator = SqlValidator::new(ValidatorOptions {
        read_only: false,
        ..Default::default()
    });
    let schema = shop_schema();

    let ok = validator.validate(
        "INSERT INTO order_items (order_id, product, quantity) VALUES (1, 'pen', 3)",
        &schema,
    );
    assert!(ok.is_valid(), "{:?}", ok);

    let bad = validator.validate(
        "INSERT INTO order_items (order_id, colour, quantity) VALUES (1, 'red', 'many')",
        &schema,
    );
    let kinds: Vec<_> = bad.violations().iter().map(|v| v.kind()).collect();
    assert_eq!(kinds, vec!["unknown_column", "type_mismatch"]);
}

#[test]
fn test_update_assignment_type() {
    let validator = SqlValidator::new(ValidatorOptions {
        read_only: false,
        ..Default::default()
    });
    let outcome = validator.validate("UPDATE orders SET total = 'lots' WHERE id = 1", &shop_schema());
    assert_eq!(outcome.len(), 1);
    assert_eq!(outcome.violations()[0].kind(), "type_mismatch");
}

#[test]
fn test_deterministic_outcome() {
    let sql = "SELECT a, b, c FROM nowhere JOIN elsewhere ON 1 = 1";
    let first = validator().validate(sql, &shop_schema());
    for _ in 0..5 {
        assert_eq!(validator().validate(sql, &shop_schema()), first);
    }
    assert_eq!(
        first.violations(),
        &[Violation::unknown_table("nowhere"), Violation::unknown_table("elsewhere")]
    );
}

#[test]
fn test_other_dialects_parse() {
    let schema = shop_schema();
    for dialect in [SqlDialect::Generic, SqlDialect::MySql, SqlDialect::Sqlite] {
        let validator = SqlValidator::new(ValidatorOptions {
            dialect,
            ..Default::default()
        });
        let outcome = validator.validate("SELECT name FROM users LIMIT 5", &schema);
        assert!(outcome.is_valid(), "{}: {:?}", dialect, outcome);
    }
}

#[test]
fn test_procedure_calls_are_forbidden() {
    let outcome = validator().validate("CALL refresh_stats()", &shop_schema());
    assert!(!outcome.is_valid());
    assert!(outcome
        .violations()
        .iter()
        .all(|v| matches!(v, Violation::ForbiddenStatementKind { .. } | Violation::SyntaxError { .. })));
}

#[test]
fn test_unknown_columns_inside_every_expression_form() {
    let schema = shop_schema();
    let queries = [
        "SELECT SUBSTRING(bogus FROM 1 FOR 3) FROM users",
        "SELECT TRIM(bogus) FROM users",
        "SELECT CEIL(bogus) FROM orders",
        "SELECT FLOOR(bogus) FROM orders",
        "SELECT POSITION('a' IN bogus) FROM users",
        "SELECT bogus AT TIME ZONE 'UTC' FROM users",
        "SELECT id FROM orders WHERE bogus = ANY(ARRAY[1, 2])",
        "SELECT id FROM orders WHERE total > ALL(ARRAY[bogus])",
        "SELECT name, ROW_NUMBER() OVER (PARTITION BY bogus ORDER BY id) FROM users",
        "SELECT name, ROW_NUMBER() OVER (ORDER BY bogus) FROM users",
        "SELECT COUNT(*) FILTER (WHERE bogus > 1) FROM orders",
        "SELECT STRING_AGG(product, ',' ORDER BY bogus) FROM order_items",
        "SELECT DISTINCT ON (bogus) name FROM users",
        "SELECT id FROM users UNION SELECT user_id FROM orders ORDER BY bogus",
    ];
    for sql in queries {
        let outcome = validator().validate(sql, &schema);
        assert_eq!(
            outcome.violations(),
            &[Violation::unknown_column("bogus")],
            "{}",
            sql
        );
    }
}

#[test]
fn test_window_and_set_operation_queries_still_valid() {
    let schema = shop_schema();
    let queries = [
        "SELECT name, ROW_NUMBER() OVER (PARTITION BY email ORDER BY created_at) AS rn FROM users",
        "SELECT user_id, SUM(total) OVER (PARTITION BY user_id) FROM orders",
        "SELECT id FROM users UNION SELECT user_id FROM orders ORDER BY id",
        "SELECT DISTINCT ON (user_id) user_id, total FROM orders ORDER BY user_id, total DESC",
        "SELECT SUBSTRING(name FROM 1 FOR 3), TRIM(email) FROM users",
        "SELECT created_at AT TIME ZONE 'UTC' FROM users",
    ];
    for sql in queries {
        let outcome = validator().validate(sql, &schema);
        assert!(outcome.is_valid(), "{} -> {:?}", sql, outcome);
    }
}

#[test]
fn test_select_into_rejected_in_read_only_mode() {
    let outcome = validator().validate("SELECT * INTO stolen FROM users", &shop_schema());
    assert_eq!(
        outcome.violations(),
        &[Violation::ForbiddenStatementKind {
            statement: "SELECT INTO".to_string()
        }]
    );
}
