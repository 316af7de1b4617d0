diesel::table! {
    deletion_requests (id) {
        id -> Uuid,
        user_id -> Uuid,
        scheduled_for_deletion_at -> Timestamp,
        restoration_token_hash -> Bytea,
        is_restored -> Bool,
        restored_at -> Nullable<Timestamp>,
        claimed_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    job_registry (job_name) {
        job_name -> Text,
        last_run_timestamp -> Timestamp,
    }
}

// Only the columns this crate touches. The rest of the profile belongs to the profile service.
diesel::table! {
    profiles (user_id) {
        user_id -> Uuid,
        deactivated_at -> Nullable<Timestamp>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(deletion_requests, job_registry, profiles,);
