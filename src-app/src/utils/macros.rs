// FICHIER : src-app/src/utils/macros.rs

/// Affiche une info à l'utilisateur (traduite) et logue l'événement
#[macro_export]
macro_rules! user_info {
    ($key:expr) => {{
        let msg = $crate::utils::i18n::t($key);
        println!("{}", msg);
        tracing::info!(event = "user_notification", key = $key, message = %msg);
    }};
    ($key:expr, $($arg:tt)*) => {{
        let args_formatted = format!($($arg)*);
        let full_msg = format!("{} {}", $crate::utils::i18n::t($key), args_formatted);
        println!("{}", full_msg);
        tracing::info!(event = "user_notification", key = $key, message = %full_msg);
    }};
}

/// Affiche un succès à l'utilisateur
#[macro_export]
macro_rules! user_success {
    ($key:expr) => {{
        let msg = $crate::utils::i18n::t($key);
        println!("✅ {}", msg);
        tracing::info!(event = "user_success", key = $key, message = %msg);
    }};
    ($key:expr, $($arg:tt)*) => {{
        let args_formatted = format!($($arg)*);
        let full_msg = format!("{} {}", $crate::utils::i18n::t($key), args_formatted);
        println!("✅ {}", full_msg);
        tracing::info!(event = "user_success", key = $key, message = %full_msg);
    }};
}

/// Affiche une erreur à l'utilisateur et logue sa structure technique
#[macro_export]
macro_rules! user_error {
    ($key:expr) => {{
        let msg = $crate::utils::i18n::t($key);
        eprintln!("❌ {}", msg);
        tracing::error!(event = "user_error", key = $key, message = %msg);
    }};

    // Format enrichi avec l'utilisateur connecté
    (
        $key:expr,
        error = $err:expr,
        component = $comp:expr,
        action = $action:expr,
        user_id = $usr_id:expr
    ) => {{
        let msg = $crate::utils::i18n::t($key);
        eprintln!("❌ [{}] {} : {}", $comp, msg, $err);
        tracing::error!(
            service = "clubhouse", componentName = $comp, action = $action,
            reason = %msg, error = ?$err, userId = %$usr_id,
            event = "user_error", key = $key
        );
    }};

    // Format enrichi minimal
    (
        $key:expr,
        error = $err:expr,
        component = $comp:expr,
        action = $action:expr
    ) => {{
        let msg = $crate::utils::i18n::t($key);
        eprintln!("❌ [{}] {} : {}", $comp, msg, $err);
        tracing::error!(
            service = "clubhouse", componentName = $comp, action = $action,
            reason = %msg, error = ?$err,
            event = "user_error", key = $key
        );
    }};

    // Toujours en dernier : sinon il capture les formes enrichies
    ($key:expr, $($arg:tt)*) => {{
        let args_formatted = format!($($arg)*);
        let full_msg = format!("{} {}", $crate::utils::i18n::t($key), args_formatted);
        eprintln!("❌ {}", full_msg);
        tracing::error!(event = "user_error", key = $key, message = %full_msg);
    }};
}

#[cfg(test)]
mod tests {
    use crate::utils::error::AppError;

    #[test]
    fn test_macro_user_error_forms() {
        let err = AppError::connection("refus");
        user_error!(
            err.message_key(),
            error = err,
            component = "ADMIN",
            action = "LOAD_COLLECTION",
            user_id = "admin"
        );

        let err = AppError::validation("JSON");
        user_error!(
            "ERR_VALIDATION",
            error = err,
            component = "FORM",
            action = "SUBMIT"
        );

        user_error!("ERR_NOT_FOUND", "{}", "booking 42");
        user_info!("MSG_LOGOUT");
        user_success!("MSG_SAVED", "{}", 1);
    }
}
