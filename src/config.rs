//! Configuração do wpcost carregada a partir de `wpcost.toml`.
//!
//! A struct [`CostConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `WPCOST_DATABASE` e `WPCOST_BIND` têm precedência
//! sobre o arquivo.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{CostError, CostResult};

/// Nome do arquivo procurado no diretório atual quando `--config` não é dado.
pub const DEFAULT_CONFIG_FILE: &str = "wpcost.toml";

/// Configuração de nível superior carregada de `wpcost.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CostConfig {
    /// Caminho do banco SQLite com os registros de custo.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Endereço em que o servidor HTTP escuta.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Filtro de log padrão quando `RUST_LOG` não está definido.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Valor padrão para o banco: "wpcost.db" no diretório atual.
fn default_database_path() -> PathBuf {
    PathBuf::from("wpcost.db")
}

// Valor padrão para o endereço: apenas loopback.
fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_addr: default_bind_addr(),
            log_level: default_log_level(),
        }
    }
}

impl CostConfig {
    /// Carrega a configuração de `path`, ou de `wpcost.toml` no diretório atual.
    ///
    /// Um arquivo explícito que não existe é erro; o arquivo padrão ausente
    /// resulta nos valores padrão.
    pub fn load(path: Option<&Path>) -> CostResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> CostResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CostError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str::<CostConfig>(&contents)?)
    }

    /// Aplica as variáveis de ambiente por cima dos valores do arquivo.
    /// Variáveis vazias são ignoradas.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(db) = lookup("WPCOST_DATABASE")
            && !db.is_empty()
        {
            self.database_path = PathBuf::from(db);
        }
        if let Some(bind) = lookup("WPCOST_BIND")
            && !bind.is_empty()
        {
            self.bind_addr = bind;
        }
    }

    /// Interpreta `bind_addr` como endereço de socket.
    pub fn socket_addr(&self) -> CostResult<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|e| CostError::Config(format!("invalid bind_addr {:?}: {e}", self.bind_addr)))
    }
}
