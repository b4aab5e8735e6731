//! Properties that must hold for every schema, checked over hand-built families.

use strata::migrate::{
    MigrationError, SqlGenerator, TableDiff, diff_schemas, reverse_order, topo_sort,
};
use strata::schema::{Column, ForeignKey, Index, Schema, Table, normalize_default, normalize_type};

/// Spellings a declaration and a catalog may use for the same type.
const SYNONYMS: &[(&str, &str)] = &[
    ("int", "integer"),
    ("int4", "bigint"),
    ("int64", "int8"),
    ("serial", "integer"),
    ("float", "double precision"),
    ("float64", "numeric"),
    ("decimal(10,2)", "numeric"),
    ("string", "character varying"),
    ("varchar(255)", "text"),
    ("bool", "boolean"),
    ("timestamp", "timestamp with time zone"),
    ("datetime", "timestamptz"),
    ("time", "timestamp without time zone"),
    ("json", "jsonb"),
    ("UUID", "uuid"),
];

fn sample_schemas() -> Vec<Schema> {
    vec![
        Schema::new(),
        Schema::from_tables([Table::new("solo").column(Column::new("id", "int").primary_key())])
            .unwrap(),
        Schema::from_tables([
            Table::new("users")
                .column(Column::new("id", "int").primary_key().auto_increment())
                .column(Column::new("email", "varchar").size(320).not_null().unique())
                .column(Column::new("created_at", "timestamp").default_value("now()"))
                .index(Index::new("idx_users_created_at", ["created_at"])),
            Table::new("teams")
                .column(Column::new("id", "bigint").primary_key().auto_increment())
                .column(Column::new("owner_id", "int"))
                .column(Column::new("parent_id", "bigint"))
                .foreign_key(ForeignKey::new("owner_id", "users"))
                .foreign_key(ForeignKey::new("parent_id", "teams")),
            Table::new("memberships")
                .column(Column::new("id", "int").primary_key().auto_increment())
                .column(Column::new("team_id", "bigint").not_null())
                .column(Column::new("user_id", "int").not_null())
                .column(Column::new("weight", "decimal").precision(10, 2).default_value("0.0"))
                .index(Index::new("idx_memberships_pair", ["team_id", "user_id"]).unique())
                .foreign_key(ForeignKey::new("team_id", "teams"))
                .foreign_key(ForeignKey::new("user_id", "users")),
        ])
        .unwrap(),
    ]
}

/// A chain `t0 <- t1 <- ... <- tn` declared in the given order.
fn chain(order: &[usize]) -> Vec<Table> {
    order
        .iter()
        .map(|&i| {
            let mut table = Table::new(format!("t{i}")).column(Column::new("id", "int").primary_key());
            if i > 0 {
                table = table
                    .column(Column::new("parent_id", "int"))
                    .foreign_key(ForeignKey::new("parent_id", format!("t{}", i - 1)));
            }
            table
        })
        .collect()
}

fn names(tables: &[Table]) -> Vec<String> {
    tables.iter().map(|t| t.name.clone()).collect()
}

#[test]
fn test_diff_with_self_is_empty() {
    for schema in sample_schemas() {
        let diff = diff_schemas(&schema, &schema).unwrap();
        assert!(diff.is_empty(), "{schema}: {diff:?}");
        assert!(diff.tables_to_modify.iter().all(TableDiff::is_empty));
    }
}

#[test]
fn test_synonyms_normalize_identically() {
    for (a, b) in SYNONYMS {
        assert_eq!(normalize_type(a), normalize_type(b), "{a} vs {b}");
        assert_eq!(normalize_type(b), normalize_type(a), "{b} vs {a}");
    }
}

#[test]
fn test_synonym_spellings_are_not_changes() {
    for (declared, catalog) in SYNONYMS {
        let current = Schema::from_tables([Table::new("t")
            .column(Column::new("id", "int").primary_key())
            .column(Column::new("value", *catalog))])
        .unwrap();
        let target = Schema::from_tables([Table::new("t")
            .column(Column::new("id", "int").primary_key())
            .column(Column::new("value", *declared))])
        .unwrap();

        let diff = diff_schemas(&current, &target).unwrap();
        assert!(diff.is_empty(), "{declared} vs {catalog}: {diff:?}");
    }
}

#[test]
fn test_equivalent_defaults_are_not_changes() {
    let pairs = [
        ("", "NULL"),
        ("DEFAULT NULL", ""),
        ("0", "0.0"),
        ("now()", "CURRENT_TIMESTAMP"),
        ("current_timestamp()", "now()"),
        ("'active'", "'active'::character varying"),
        ("nextval('users_id_seq'::regclass)", "NEXTVAL('x')"),
    ];
    for (a, b) in pairs {
        assert_eq!(normalize_default(a), normalize_default(b), "{a} vs {b}");
    }
}

#[test]
fn test_topological_order_for_every_declaration_order() {
    let orders: [&[usize]; 6] = [
        &[0, 1, 2, 3],
        &[3, 2, 1, 0],
        &[2, 0, 3, 1],
        &[1, 3, 0, 2],
        &[3, 0, 2, 1],
        &[0, 2, 1, 3],
    ];
    for order in orders {
        let sorted = topo_sort(&chain(order)).unwrap();
        assert_eq!(names(&sorted), vec!["t0", "t1", "t2", "t3"], "{order:?}");

        let dropped = reverse_order(&sorted);
        let mut expected = names(&sorted);
        expected.reverse();
        assert_eq!(names(&dropped), expected);
    }
}

#[test]
fn test_every_cycle_is_reported() {
    for len in 2..=5 {
        let tables: Vec<Table> = (0..len)
            .map(|i| {
                Table::new(format!("c{i}"))
                    .column(Column::new("id", "int").primary_key())
                    .column(Column::new("next_id", "int"))
                    .foreign_key(ForeignKey::new("next_id", format!("c{}", (i + 1) % len)))
            })
            .collect();

        match topo_sort(&tables) {
            Err(MigrationError::Dependency { table }) => {
                assert!(table.starts_with('c'), "cycle of {len}: {table}");
            }
            other => panic!("cycle of {len} was ordered: {other:?}"),
        }
    }
}

#[test]
fn test_down_reverses_column_changes() {
    let current = Schema::from_tables([Table::new("users")
        .column(Column::new("id", "int").primary_key().auto_increment())
        .column(Column::new("legacy", "text").default_value("'x'"))
        .column(Column::new("nickname", "varchar").size(40))])
    .unwrap();
    let target = Schema::from_tables([Table::new("users")
        .column(Column::new("id", "int").primary_key().auto_increment())
        .column(Column::new("nickname", "varchar").size(40))
        .column(Column::new("email", "varchar").not_null())
        .column(Column::new("age", "int"))])
    .unwrap();

    let diff = diff_schemas(&current, &target).unwrap();
    let sql = SqlGenerator::postgres().generate(&diff).unwrap();

    for added in ["email", "age"] {
        assert!(sql.up.contains(&format!("ADD COLUMN \"{added}\"")));
        assert!(sql.down.contains(&format!("DROP COLUMN \"{added}\"")));
    }
    assert!(sql.up.contains("DROP COLUMN \"legacy\""));
    assert!(sql.down.contains("ADD COLUMN \"legacy\" text DEFAULT 'x'"));
    assert!(!sql.needs_manual_rollback());
}

#[test]
fn test_type_change_needs_manual_rollback() {
    let current = Schema::from_tables([Table::new("users")
        .column(Column::new("id", "int").primary_key())
        .column(Column::new("score", "int"))])
    .unwrap();
    let target = Schema::from_tables([Table::new("users")
        .column(Column::new("id", "int").primary_key())
        .column(Column::new("score", "decimal").precision(8, 2))])
    .unwrap();

    let diff = diff_schemas(&current, &target).unwrap();
    let sql = SqlGenerator::postgres().generate(&diff).unwrap();
    assert!(sql.up.contains("ALTER COLUMN \"score\" TYPE decimal(8,2)"));
    assert!(sql.needs_manual_rollback());
}

#[test]
fn test_generation_is_deterministic() {
    for schema in sample_schemas().into_iter().filter(|s| !s.is_empty()) {
        let diff = diff_schemas(&Schema::new(), &schema).unwrap();
        let first = SqlGenerator::postgres().generate(&diff).unwrap();
        let second = SqlGenerator::postgres().generate(&diff.clone()).unwrap();
        assert_eq!(first.up, second.up);
        assert_eq!(first.down, second.down);
    }
}
