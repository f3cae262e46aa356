use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pagesift API",
        version = "0.1.0",
        description = "Declarative web page extraction: whole-page, selective, and array modes."
    ),
    paths(
        crate::routes::extract,
        crate::routes::extract_batch,
        crate::routes::quota,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::ExtractRequest,
        crate::dto::BatchRequest,
        crate::dto::ErrorResponse,
        crate::dto::QuotaResponse,
        crate::dto::QuotaRuleInfo,
        crate::dto::HealthResponse,
    )),
    tags(
        (name = "extract", description = "Page extraction"),
        (name = "system", description = "Health and quota status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the `X-API-Key` security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::with_description(
                            "X-API-Key",
                            "Trusted key exempt from quota enforcement. \
                             Configured via PAGESIFT_API_KEYS.",
                        ),
                    ),
                ),
            );
        }
    }
}
