use diesel::{Identifiable, Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::profiles;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Insertable, Queryable)]
#[diesel(table_name = profiles, primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProfileDeactivation {
    pub user_id: Uuid,
    pub deactivated_at: Option<SystemTime>,
}
