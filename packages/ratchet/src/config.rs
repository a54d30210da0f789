//! Централизованная конфигурация ratchet-ядра
//!
//! Протокольные лимиты по умолчанию берутся из [`crate::consts`]; здесь их
//! можно переопределить (например, из переменных окружения) до первого
//! обращения к [`Config::global`].

use crate::consts;
use std::sync::OnceLock;

/// Глобальная конфигурация (синглтон)
static GLOBAL_CONFIG: OnceLock<Config> = OnceLock::new();

/// Основная структура конфигурации
#[derive(Debug, Clone)]
pub struct Config {
    // ============================================
    // DOUBLE RATCHET ПАРАМЕТРЫ
    // ============================================

    /// Максимальное количество пропущенных ключей в одной цепочке (DoS защита)
    pub max_message_keys: usize,

    /// На сколько сообщений вперёд разрешено прыгнуть счётчику
    pub max_forward_jumps: u32,

    /// Сколько receiver chains хранится в одном SessionState
    pub max_receiver_chains: usize,

    /// Сколько архивных SessionState хранится в SessionRecord
    pub archived_states_max_length: usize,

    // ============================================
    // SENDER KEYS
    // ============================================

    /// Сколько SenderKeyState хранится в одном SenderKeyRecord
    pub max_sender_key_states: usize,

    // ============================================
    // FINGERPRINT
    // ============================================

    /// Количество итераций SHA-512 при вычислении отпечатка.
    /// Должно совпадать у всех клиентов сети.
    pub fingerprint_iterations: u32,

    /// Версия сканируемого отпечатка
    pub fingerprint_version: u32,

    // ============================================
    // ШИФРОВАНИЕ СООБЩЕНИЙ
    // ============================================

    /// Длина nonce для ChaCha20Poly1305 (в байтах); поддерживается только 12
    pub chacha_nonce_length: usize,

    /// Длина усечённого MAC в SignalMessage (в байтах)
    pub mac_length: usize,
}

impl Config {
    /// Создать конфигурацию с дефолтными значениями
    pub fn default() -> Self {
        Self {
            // Double Ratchet
            max_message_keys: consts::MAX_MESSAGE_KEYS,
            max_forward_jumps: consts::MAX_FORWARD_JUMPS,
            max_receiver_chains: consts::MAX_RECEIVER_CHAINS,
            archived_states_max_length: consts::ARCHIVED_STATES_MAX_LENGTH,

            // Sender keys
            max_sender_key_states: consts::MAX_SENDER_KEY_STATES,

            // Fingerprint
            fingerprint_iterations: consts::DEFAULT_FINGERPRINT_ITERATIONS,
            fingerprint_version: 1,

            // Шифрование
            chacha_nonce_length: 12,
            mac_length: consts::MAC_LENGTH,
        }
    }

    /// Создать конфигурацию из переменных окружения
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Переопределяем значения из env, если они заданы
        if let Ok(val) = std::env::var("MAX_MESSAGE_KEYS") {
            if let Ok(parsed) = val.parse() {
                config.max_message_keys = parsed;
            }
        }

        if let Ok(val) = std::env::var("MAX_FORWARD_JUMPS") {
            if let Ok(parsed) = val.parse() {
                config.max_forward_jumps = parsed;
            }
        }

        if let Ok(val) = std::env::var("ARCHIVED_STATES_MAX_LENGTH") {
            if let Ok(parsed) = val.parse() {
                config.archived_states_max_length = parsed;
            }
        }

        if let Ok(val) = std::env::var("FINGERPRINT_ITERATIONS") {
            if let Ok(parsed) = val.parse() {
                config.fingerprint_iterations = parsed;
            }
        }

        config
    }

    /// Получить глобальный экземпляр конфигурации
    ///
    /// Автоматически инициализирует конфигурацию со значениями по умолчанию при первом вызове
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }

    /// Инициализировать глобальную конфигурацию со значениями по умолчанию
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init() -> Result<(), &'static str> {
        GLOBAL_CONFIG.set(Self::default())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию из переменных окружения
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_from_env() -> Result<(), &'static str> {
        GLOBAL_CONFIG.set(Self::from_env())
            .map_err(|_| "Config already initialized")
    }

    /// Инициализировать глобальную конфигурацию с кастомным экземпляром
    ///
    /// # Errors
    ///
    /// Возвращает ошибку, если конфигурация уже была инициализирована
    pub fn init_with(config: Config) -> Result<(), &'static str> {
        GLOBAL_CONFIG.set(config)
            .map_err(|_| "Config already initialized")
    }

    /// Проверить, инициализирована ли глобальная конфигурация
    pub fn is_initialized() -> bool {
        GLOBAL_CONFIG.get().is_some()
    }
}
