mod auth;
mod config;
mod error;
mod middleware;
mod models;
mod provider;
mod routes;
mod session;
mod store;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;

use crate::middleware::RequestLogger;
use crate::models::role::EmailSubstringRoles;
use crate::provider::http::HttpIdentityProvider;
use crate::routes as app_routes;
use crate::session::resolver::SessionResolver;
use crate::store::appointment::{AppointmentRepository, LocalAppointmentRepository};
use crate::store::{AppointmentStore, file_slot::FileSlotStore};
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket, catchers, http::Method};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::{get_openapi_route, okapi::merge::marge_spec_list};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG still wins for fine-grained per-module control, e.g.
    // RUST_LOG=info,carelink::session=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    if json_format {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

fn build_cors(cors_config: &config::CorsConfig) -> CorsOptions {
    let is_wildcard = cors_config.allowed_origins.len() == 1 && cors_config.allowed_origins[0] == "*";

    if is_wildcard && cors_config.allow_credentials {
        panic!(
            "Invalid CORS configuration: Cannot use wildcard origins (*) with credentials enabled. \
            Either set specific origins or disable credentials."
        );
    }

    let allowed_origins = if cors_config.allowed_origins.is_empty() {
        AllowedOrigins::some_exact::<&str>(&[])
    } else if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    CorsOptions {
        allowed_origins,
        allowed_methods: vec![Method::Get, Method::Post, Method::Patch, Method::Options, Method::Head]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: rocket_cors::AllowedHeaders::some(&["Content-Type", "Authorization", "Accept"]),
        allow_credentials: cors_config.allow_credentials,
        ..Default::default()
    }
}

fn get_swagger_config(openapi_url: &str) -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: openapi_url.to_string(),
        ..Default::default()
    }
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return config::DEFAULT_API_BASE_PATH.to_string();
    }

    let mut normalized = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };

    while normalized.ends_with('/') && normalized.len() > 1 {
        normalized.pop();
    }

    normalized
}

fn join_base_path(base_path: &str, path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    let suffix = path.trim_start_matches('/');

    if base.is_empty() {
        format!("/{}", suffix)
    } else {
        format!("{}/{}", base, suffix)
    }
}

fn collect_base_paths(api_config: &config::ApiConfig) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    let mut push_unique = |path: String| {
        if !normalized.contains(&path) {
            normalized.push(path);
        }
    };

    push_unique(normalize_base_path(&api_config.base_path));

    for extra in &api_config.additional_base_paths {
        let normalized_extra = normalize_base_path(extra);
        if !normalized_extra.is_empty() {
            push_unique(normalized_extra);
        }
    }

    normalized
}

struct RouteSpec {
    path: &'static str,
    routes: Vec<rocket::Route>,
    openapi: rocket_okapi::okapi::openapi3::OpenApi,
}

fn collect_route_specs() -> Vec<RouteSpec> {
    let (auth_routes, auth_openapi) = app_routes::auth::routes();
    let (appointment_routes, appointment_openapi) = app_routes::appointment::routes();
    let (health_routes, health_openapi) = app_routes::health::routes();

    vec![
        RouteSpec {
            path: "/auth",
            routes: auth_routes,
            openapi: auth_openapi,
        },
        RouteSpec {
            path: "/appointments",
            routes: appointment_routes,
            openapi: appointment_openapi,
        },
        RouteSpec {
            path: "/health",
            routes: health_routes,
            openapi: health_openapi,
        },
    ]
}

fn mount_api_routes(mut rocket: Rocket<Build>, base_path: &str, enable_swagger: bool) -> Rocket<Build> {
    let route_specs = collect_route_specs();

    if enable_swagger {
        let mut openapi_list = Vec::new();
        for spec in route_specs {
            rocket = rocket.mount(format!("{}{}", base_path, spec.path), spec.routes);
            openapi_list.push((spec.path, spec.openapi));
        }

        let openapi_docs = match marge_spec_list(&openapi_list) {
            Ok(docs) => docs,
            Err(err) => panic!("Could not merge OpenAPI spec: {}", err),
        };

        let settings = rocket_okapi::settings::OpenApiSettings::default();
        rocket = rocket.mount(base_path, vec![get_openapi_route(openapi_docs, &settings)]);

        let docs_path = join_base_path(base_path, "docs");
        let openapi_url = join_base_path(base_path, "openapi.json");
        rocket = rocket.mount(docs_path, make_swagger_ui(&get_swagger_config(&openapi_url)));
    } else {
        for spec in route_specs {
            rocket = rocket.mount(format!("{}{}", base_path, spec.path), spec.routes);
        }
    }

    rocket
}

/// Builds the core on ignite: slot store, appointment repository, identity
/// provider and session resolver, with the resolver's initial session fetch
/// resolved before the server accepts requests.
fn stage_core(config: Config) -> AdHoc {
    AdHoc::try_on_ignite("Carelink core", move |rocket| async move {
        let slots = match FileSlotStore::new(&config.storage.data_dir) {
            Ok(slots) => Arc::new(slots),
            Err(e) => {
                tracing::error!(error = ?e, "failed to initialize appointment storage");
                return Err(rocket);
            }
        };
        let repository: Arc<dyn AppointmentRepository> = Arc::new(LocalAppointmentRepository::new(AppointmentStore::new(slots)));

        let provider = Arc::new(HttpIdentityProvider::new(&config.identity));
        let resolver = Arc::new(SessionResolver::new(provider, Arc::new(EmailSubstringRoles)));
        resolver.init().await;
        tracing::info!(phase = ?resolver.state().phase, "session resolver initialized");

        Ok(rocket.manage(config).manage(repository).manage(resolver))
    })
}

pub fn build_rocket(config: Config) -> Rocket<Build> {
    init_tracing(&config.logging.level, config.logging.json_format);

    let cors = build_cors(&config.cors).to_cors().expect("Failed to create CORS fairing");

    let base_paths = collect_base_paths(&config.api);
    let enable_swagger = config.api.enable_swagger;

    let mut rocket = rocket::build().attach(cors).attach(RequestLogger).attach(stage_core(config));

    let (primary_base_path, additional_base_paths) = base_paths.split_first().expect("API base paths must include at least one entry");
    rocket = mount_api_routes(rocket, primary_base_path, enable_swagger);

    rocket = rocket.register(
        primary_base_path.as_str(),
        catchers![app_routes::error::unauthorized, app_routes::error::not_found, app_routes::error::conflict],
    );

    for base_path in additional_base_paths {
        rocket = mount_api_routes(rocket, base_path, enable_swagger);

        rocket = rocket.register(
            base_path.as_str(),
            catchers![app_routes::error::unauthorized, app_routes::error::not_found, app_routes::error::conflict],
        );
    }

    rocket
}
