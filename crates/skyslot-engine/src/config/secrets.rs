use super::loader::ConfigError;
use std::fmt;

pub const ENV_CLOUDINARY_NAME: &str = "CLOUDINARY_NAME";
pub const ENV_CLOUDINARY_API_KEY: &str = "CLOUDINARY_API_KEY";
pub const ENV_CLOUDINARY_API_SECRET: &str = "CLOUDINARY_API_SECRET";
pub const ENV_NOTION_TOKEN: &str = "NOTION_TOKEN";
pub const ENV_NOTION_PAGE_ID: &str = "NOTION_PAGE_ID";
pub const ENV_NOTION_DATABASE_ID: &str = "NOTION_DATABASE_ID";
pub const ENV_CHROME_BIN: &str = "CHROME_BIN";
pub const ENV_USER_DATA_DIR: &str = "SKYSLOT_USER_DATA_DIR";

#[derive(Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for CloudinaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

/// Credentials and external identifiers, read from the environment at startup.
#[derive(Clone)]
pub struct Secrets {
    pub cloudinary: CloudinaryCredentials,
    pub notion_token: String,
    /// Block whose descendants hold the image slots.
    pub root_block_id: String,
    /// Archive database; daily records are disabled without it.
    pub archive_database_id: Option<String>,
    pub chrome_bin: Option<String>,
    pub user_data_dir: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("cloudinary", &self.cloudinary)
            .field("notion_token", &"***")
            .field("root_block_id", &self.root_block_id)
            .field("archive_database_id", &self.archive_database_id)
            .field("chrome_bin", &self.chrome_bin)
            .field("user_data_dir", &self.user_data_dir)
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| optional(key).ok_or(ConfigError::MissingEnv(key));

        Ok(Self {
            cloudinary: CloudinaryCredentials {
                cloud_name: required(ENV_CLOUDINARY_NAME)?,
                api_key: required(ENV_CLOUDINARY_API_KEY)?,
                api_secret: required(ENV_CLOUDINARY_API_SECRET)?,
            },
            notion_token: required(ENV_NOTION_TOKEN)?,
            root_block_id: required(ENV_NOTION_PAGE_ID)?,
            archive_database_id: optional(ENV_NOTION_DATABASE_ID),
            chrome_bin: optional(ENV_CHROME_BIN),
            user_data_dir: optional(ENV_USER_DATA_DIR),
        })
    }
}
