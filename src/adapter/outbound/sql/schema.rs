// Diesel table definitions shared by every relational dialect.
//
// No foreign keys are declared: ownership of presences and resources by an
// allocation is enforced by the unregister cascade.

diesel::table! {
    allocations (id) {
        id -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    presences (username, resource) {
        username -> Text,
        resource -> Text,
        allocation_id -> Text,
        available -> Bool,
        priority -> SmallInt,
        status -> Nullable<Text>,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    resources (username, resource) {
        username -> Text,
        resource -> Text,
        allocation_id -> Text,
        priority -> SmallInt,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    users (username) {
        username -> Text,
        password_hash -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}
