//! Dashboard endpoint
//!
//! Returns demo dashboard data for the authenticated caller. The stats
//! and activity feed are fabricated; only the user block reflects real
//! state.

use std::net::SocketAddr;

use axum::{
    extract::ConnectInfo,
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;

use super::dto::UserSummary;
use crate::auth::{CurrentUser, client_addr};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardStats {
    login_count: u32,
    last_login: DateTime<Utc>,
    account_age: i64,
}

#[derive(Debug, Serialize)]
struct ActivityEntry {
    action: String,
    timestamp: DateTime<Utc>,
    ip: String,
}

#[derive(Debug, Serialize)]
struct NotificationEntry {
    #[serde(rename = "type")]
    kind: String,
    message: String,
    read: bool,
}

#[derive(Debug, Serialize)]
struct DashboardData {
    user: UserSummary,
    stats: DashboardStats,
    activities: Vec<ActivityEntry>,
    notifications: Vec<NotificationEntry>,
}

#[derive(Debug, Serialize)]
struct DashboardResponse {
    dashboard: DashboardData,
    message: String,
}

/// GET /api/dashboard
pub async fn get_dashboard(
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> impl IntoResponse {
    let now = Utc::now();
    let ip = client_addr(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    let stats = DashboardStats {
        login_count: rand::thread_rng().gen_range(1..=100),
        last_login: user.last_login_at,
        account_age: (now - user.created_at).num_days(),
    };

    let activities = vec![
        ActivityEntry {
            action: "Logged in".to_string(),
            timestamp: now,
            ip: ip.clone(),
        },
        ActivityEntry {
            action: "Viewed profile".to_string(),
            timestamp: now - Duration::hours(1),
            ip: ip.clone(),
        },
        ActivityEntry {
            action: "Updated settings".to_string(),
            timestamp: now - Duration::hours(2),
            ip,
        },
    ];

    let notifications = vec![
        NotificationEntry {
            kind: "info".to_string(),
            message: "Welcome to the OAuth tutorial!".to_string(),
            read: false,
        },
        NotificationEntry {
            kind: "success".to_string(),
            message: "Your account is verified".to_string(),
            read: true,
        },
    ];

    Json(DashboardResponse {
        dashboard: DashboardData {
            user: UserSummary::from(&user),
            stats,
            activities,
            notifications,
        },
        message: "Dashboard data retrieved successfully".to_string(),
    })
}
