//! Password hashing with a scheme chosen by self-test at startup
//!
//! At startup the service tries the operator-configured Argon2id cost
//! parameters, then the Argon2 library defaults, then PBKDF2-SHA256. The
//! first scheme that passes a hash/verify self-test is used for every new
//! hash for the lifetime of the process. Verification accepts any of the
//! supported schemes, so hashes written under an earlier fallback keep
//! working.

use anyhow::{Result, anyhow};
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use pbkdf2::Pbkdf2;
use tracing::{error, info, warn};

const SELF_TEST_PASSWORD: &str = "self-test-password";

/// Password hashing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasherConfig {
    /// Argon2 memory cost in KiB
    pub memory_kib: u32,
    /// Argon2 iteration count
    pub iterations: u32,
    /// Argon2 degree of parallelism
    pub parallelism: u32,
    /// PBKDF2 rounds used when Argon2 is unavailable
    pub pbkdf2_rounds: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
            pbkdf2_rounds: 600_000,
        }
    }
}

impl HasherConfig {
    /// Create a new HasherConfig from environment variables
    ///
    /// # Environment Variables
    /// - `PASSWORD_HASH_MEMORY_KIB`: Argon2 memory cost (default: 19456)
    /// - `PASSWORD_HASH_ITERATIONS`: Argon2 iterations (default: 2)
    /// - `PASSWORD_HASH_PARALLELISM`: Argon2 lanes (default: 1)
    /// - `PASSWORD_HASH_PBKDF2_ROUNDS`: PBKDF2 rounds (default: 600000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |name: &str, default: u32| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };

        Self {
            memory_kib: read("PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib),
            iterations: read("PASSWORD_HASH_ITERATIONS", defaults.iterations),
            parallelism: read("PASSWORD_HASH_PARALLELISM", defaults.parallelism),
            pbkdf2_rounds: read("PASSWORD_HASH_PBKDF2_ROUNDS", defaults.pbkdf2_rounds),
        }
    }

    /// Schemes to try, most preferred first
    pub fn candidates(&self) -> Vec<HashScheme> {
        vec![
            HashScheme::Argon2 {
                memory_kib: self.memory_kib,
                iterations: self.iterations,
                parallelism: self.parallelism,
            },
            HashScheme::Argon2 {
                memory_kib: Params::DEFAULT_M_COST,
                iterations: Params::DEFAULT_T_COST,
                parallelism: Params::DEFAULT_P_COST,
            },
            HashScheme::Pbkdf2 {
                rounds: self.pbkdf2_rounds,
            },
        ]
    }
}

/// A concrete hashing algorithm together with its cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Argon2 {
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    },
    Pbkdf2 {
        rounds: u32,
    },
}

impl HashScheme {
    pub fn name(&self) -> &'static str {
        match self {
            HashScheme::Argon2 { .. } => "argon2id",
            HashScheme::Pbkdf2 { .. } => "pbkdf2-sha256",
        }
    }

    fn hash(&self, password: &[u8]) -> Result<String> {
        let salt = SaltString::generate(&mut rand::thread_rng());

        match *self {
            HashScheme::Argon2 {
                memory_kib,
                iterations,
                parallelism,
            } => {
                let params = Params::new(memory_kib, iterations, parallelism, None)
                    .map_err(|e| anyhow!("Invalid argon2 parameters: {}", e))?;
                let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
                Ok(argon2
                    .hash_password(password, &salt)
                    .map_err(|e| anyhow!("Failed to hash password: {}", e))?
                    .to_string())
            }
            HashScheme::Pbkdf2 { rounds } => {
                let params = pbkdf2::Params {
                    rounds,
                    output_length: 32,
                };
                Ok(Pbkdf2
                    .hash_password_customized(password, None, None, params, &salt)
                    .map_err(|e| anyhow!("Failed to hash password: {}", e))?
                    .to_string())
            }
        }
    }

    fn self_test(&self) -> Result<()> {
        let hash = self.hash(SELF_TEST_PASSWORD.as_bytes())?;
        if verify_any(SELF_TEST_PASSWORD, &hash) {
            Ok(())
        } else {
            Err(anyhow!("self-test hash did not verify"))
        }
    }
}

/// Password hasher fixed to the scheme selected at startup
#[derive(Debug, Clone)]
pub struct PasswordService {
    scheme: HashScheme,
}

impl PasswordService {
    /// Probe the configured candidates and keep the first working scheme
    pub fn from_config(config: &HasherConfig) -> Result<Self> {
        Self::select(config.candidates())
    }

    /// Try each scheme in order, returning a service bound to the first one
    /// that passes its self-test
    pub fn select(candidates: impl IntoIterator<Item = HashScheme>) -> Result<Self> {
        for scheme in candidates {
            match scheme.self_test() {
                Ok(()) => {
                    info!("Password hashing initialized with {} ({:?})", scheme.name(), scheme);
                    return Ok(Self { scheme });
                }
                Err(e) => {
                    warn!("Password scheme {} unavailable: {}", scheme.name(), e);
                }
            }
        }

        error!("No password hashing scheme passed its self-test");
        Err(anyhow!("no usable password hashing scheme"))
    }

    /// Scheme used for new hashes
    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    /// Hash a plaintext password into a PHC string
    pub fn hash(&self, password: &str) -> Result<String> {
        self.scheme.hash(password.as_bytes())
    }

    /// Check a plaintext password against a stored PHC string
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        verify_any(password, hash)
    }
}

fn verify_any(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is not a valid PHC string: {}", e);
            return false;
        }
    };

    let verifiers: [&dyn PasswordVerifier; 2] = [&Argon2::default(), &Pbkdf2];
    parsed.verify_password(&verifiers, password).is_ok()
}
