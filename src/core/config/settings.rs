use super::parsing::{
    env_optional, env_or_default, is_supported_image_extension, parse_bool, parse_cors_origins,
    parse_environment, parse_string_list, parse_u16, parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, GraderSettings,
    OcrSettings, RedisSettings, RuntimeSettings, S3Settings, SecuritySettings, ServerHost,
    ServerPort, ServerSettings, Settings, StorageSettings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("SHALA_HOST", "0.0.0.0");
        let port = env_or_default("SHALA_PORT", "8000");

        let environment =
            parse_environment(env_optional("SHALA_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("SHALA_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Shala API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "shalasuperuser");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "shala_db");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let ocr_api_key = env_or_default("OCR_API_KEY", "");
        let ocr_base_url = env_or_default("OCR_BASE_URL", "https://ocr.shala.org/api/v1");
        let ocr_timeout_seconds =
            parse_u64("OCR_TIMEOUT_SECONDS", env_or_default("OCR_TIMEOUT_SECONDS", "120"))?;
        let ocr_max_submit_retries =
            parse_u32("OCR_MAX_SUBMIT_RETRIES", env_or_default("OCR_MAX_SUBMIT_RETRIES", "3"))?;

        let grader_api_key = env_or_default("GRADER_API_KEY", "");
        let grader_base_url = env_or_default("GRADER_BASE_URL", "");
        let grader_model = env_or_default("GRADER_MODEL", "grader-v1");
        let grader_max_tokens =
            parse_u32("GRADER_MAX_TOKENS", env_or_default("GRADER_MAX_TOKENS", "10000"))?;
        let grader_request_timeout =
            parse_u64("GRADER_REQUEST_TIMEOUT", env_or_default("GRADER_REQUEST_TIMEOUT", "600"))?;

        let max_upload_size_mb =
            parse_u64("MAX_UPLOAD_SIZE_MB", env_or_default("MAX_UPLOAD_SIZE_MB", "10"))?;
        let allowed_image_extensions =
            parse_string_list(env_optional("ALLOWED_IMAGE_EXTENSIONS"), &["jpg", "jpeg", "png"]);
        let max_sheets_per_submission = parse_u64(
            "MAX_SHEETS_PER_SUBMISSION",
            env_or_default("MAX_SHEETS_PER_SUBMISSION", "10"),
        )?;

        let s3_endpoint = env_or_default("S3_ENDPOINT", "https://storage.shala.org");
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_bucket = env_or_default("S3_BUCKET", "shala-data-storage");
        let s3_region = env_or_default("S3_REGION", "ap-south-1");

        let first_admin_username = env_or_default("FIRST_ADMIN_USERNAME", "admin");
        let first_admin_password = env_or_default("FIRST_ADMIN_PASSWORD", "");

        let log_level = env_or_default("SHALA_LOG_LEVEL", "info");
        let json = env_optional("SHALA_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            ocr: OcrSettings {
                api_key: ocr_api_key,
                base_url: ocr_base_url,
                timeout_seconds: ocr_timeout_seconds,
                max_submit_retries: ocr_max_submit_retries,
            },
            grader: GraderSettings {
                api_key: grader_api_key,
                base_url: grader_base_url,
                model: grader_model,
                max_tokens: grader_max_tokens,
                request_timeout: grader_request_timeout,
            },
            storage: StorageSettings {
                max_upload_size_mb,
                allowed_image_extensions,
                max_sheets_per_submission,
            },
            s3: S3Settings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
            },
            admin: AdminSettings { first_admin_username, first_admin_password },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn ocr(&self) -> &OcrSettings {
        &self.ocr
    }

    pub(crate) fn grader(&self) -> &GraderSettings {
        &self.grader
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn s3(&self) -> &S3Settings {
        &self.s3
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.allowed_image_extensions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ALLOWED_IMAGE_EXTENSIONS",
                value: String::from("<empty>"),
            });
        }

        for extension in &self.storage.allowed_image_extensions {
            if !is_supported_image_extension(extension) {
                return Err(ConfigError::InvalidValue {
                    field: "ALLOWED_IMAGE_EXTENSIONS",
                    value: extension.clone(),
                });
            }
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.ocr.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("OCR_API_KEY"));
        }
        if self.ocr.base_url.is_empty() {
            return Err(ConfigError::MissingSecret("OCR_BASE_URL"));
        }
        if self.grader.api_key.is_empty() {
            return Err(ConfigError::MissingSecret("GRADER_API_KEY"));
        }
        if self.grader.base_url.is_empty() {
            return Err(ConfigError::MissingSecret("GRADER_BASE_URL"));
        }
        if self.s3.access_key.is_empty() || self.s3.secret_key.is_empty() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }
        if self.admin.first_admin_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_ADMIN_PASSWORD"));
        }

        Ok(())
    }
}
