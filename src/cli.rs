//! Interface de linha de comando do wpcost baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (serve, header, summary,
//! lock, unlock) e flags globais (--config, --database, --verbose, --json-logs).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// wpcost: rastreamento de custos por pacote de trabalho.
#[derive(Debug, Parser)]
#[command(name = "wpcost", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho para o arquivo de configuração (padrão: ./wpcost.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Caminho do banco SQLite; sobrescreve a configuração.
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Emite logs em JSON, uma linha por evento.
    #[arg(long, global = true, default_value_t = false)]
    pub json_logs: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inicia o servidor HTTP.
    Serve {
        /// Endereço de escuta; sobrescreve a configuração.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Mostra o cabeçalho de custo de um pacote de trabalho.
    Header {
        /// Identificador do pacote de trabalho.
        work_package: String,
    },

    /// Mostra o resumo do contrato de um pacote de trabalho.
    Summary {
        /// Identificador do pacote de trabalho.
        work_package: String,
    },

    /// Trava o registro de custo.
    Lock {
        /// Identificador do pacote de trabalho.
        work_package: String,
    },

    /// Destrava o registro de custo.
    Unlock {
        /// Identificador do pacote de trabalho.
        work_package: String,
    },
}
