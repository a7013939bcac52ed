use std::panic;

/// Install readable panic reports and make sure the panic lands in the log
/// before the process exits.
///
/// Debug builds get full backtraces; release builds write a crash report
/// instead of dumping a trace on the user.
pub fn initialize_panic_handler() {
    if cfg!(debug_assertions) {
        better_panic::install();
    } else {
        human_panic::setup_panic!();
    }

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        log::error!("Viewer panicked: {panic_info}");
        log::logger().flush();

        default_hook(panic_info);

        std::process::exit(1);
    }));
}
