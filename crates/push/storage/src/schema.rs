//! Diesel schema definitions.

diesel::table! {
    devices (id) {
        id -> Text,
        registration_token -> Text,
        provider -> Text,
        application_id -> Text,
        name -> Nullable<Text>,
        active -> Bool,
        created_at -> Timestamp,
    }
}
