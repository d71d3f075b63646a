// Esquema Diesel compartido por SQLite y Postgres.
// Ids como Text, listas como JSON en Text, instantes como milisegundos UTC.
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    users (id) {
        id -> Text,
        username -> Text,
        display_name -> Nullable<Text>,
        email -> Nullable<Text>,
        role -> Text,
        team_id -> Nullable<Text>,
        zone_ids -> Text,
        language -> Text,
        theme -> Text,
        is_active -> Bool,
        api_key_hash -> Text,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
    }
}
diesel::table! {
    zones (id) {
        id -> Text,
        name -> Text,
        zone_type -> Text,
        building -> Nullable<Text>,
        floor -> Nullable<Text>,
        description -> Nullable<Text>,
        is_active -> Bool,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    teams (id) {
        id -> Text,
        name -> Text,
        description -> Nullable<Text>,
        leader_id -> Nullable<Text>,
        member_ids -> Text,
        zone_ids -> Text,
        responsibilities -> Text,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    audits (id) {
        id -> Text,
        title -> Text,
        zone_id -> Text,
        auditor_id -> Nullable<Text>,
        status -> Text,
        scheduled_ts -> BigInt,
        started_at_ts -> Nullable<BigInt>,
        completed_at_ts -> Nullable<BigInt>,
        overall_score -> Nullable<Integer>,
        notes -> Nullable<Text>,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    checklist_items (id) {
        id -> Text,
        audit_id -> Text,
        position -> BigInt,
        question_id -> Nullable<Text>,
        category -> Text,
        question -> Text,
        response -> Nullable<Text>,
        note -> Nullable<Text>,
        photo -> Nullable<Text>,
        tags -> Text,
    }
}
diesel::table! {
    actions (id) {
        id -> Text,
        title -> Text,
        description -> Nullable<Text>,
        audit_id -> Nullable<Text>,
        checklist_item_id -> Nullable<Text>,
        assignee_id -> Nullable<Text>,
        zone_id -> Nullable<Text>,
        priority -> Text,
        status -> Text,
        due_ts -> Nullable<BigInt>,
        created_at_ts -> BigInt,
        closed_at_ts -> Nullable<BigInt>,
    }
}
diesel::table! {
    records (kind, id) {
        kind -> Text,
        id -> Text,
        payload -> Text,
        created_at_ts -> BigInt,
    }
}
allow_tables_to_appear_in_same_query!(users, zones, teams, audits, checklist_items, actions, records);
