//! Unified async runtime abstraction for native and WASM platforms.
//!
//! Provides a single `TaskSpawner` `SystemParam` that hides platform
//! differences: native uses `bevy_tokio_tasks` (reqwest needs a Tokio
//! runtime), WASM uses Bevy's built-in task pool (reqwest uses browser
//! fetch there).

use bevy::prelude::*;

/// Plugin that sets up the async runtime for the current platform.
pub struct AsyncRuntimePlugin;

impl Plugin for AsyncRuntimePlugin {
    fn build(&self, app: &mut App) {
        #[cfg(target_family = "wasm")]
        let _ = app;

        #[cfg(not(target_family = "wasm"))]
        app.add_plugins(bevy_tokio_tasks::TokioTasksPlugin::default());
    }
}

// Native implementation using Tokio.
#[cfg(not(target_family = "wasm"))]
mod native {
    use std::future::Future;

    use bevy::ecs::system::SystemParam;
    use bevy::prelude::*;

    /// A system parameter for spawning background fetch tasks.
    ///
    /// Tasks return `()`; results come back over `async_channel` senders
    /// moved into the future.
    #[derive(SystemParam)]
    pub struct TaskSpawner<'w, 's> {
        runtime: Res<'w, bevy_tokio_tasks::TokioTasksRuntime>,
        // Local<()> keeps the signature identical to the WASM variant.
        #[allow(dead_code)]
        _local: Local<'s, ()>,
    }

    impl TaskSpawner<'_, '_> {
        /// Spawn a background task that runs to completion.
        pub fn spawn<F>(&self, future: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            self.runtime.spawn_background_task(move |_ctx| future);
        }
    }
}

// WASM implementation using Bevy's task pool.
#[cfg(target_family = "wasm")]
mod wasm {
    use std::future::Future;

    use bevy::ecs::system::SystemParam;
    use bevy::prelude::*;
    use bevy::tasks::AsyncComputeTaskPool;

    /// A system parameter for spawning background fetch tasks.
    ///
    /// Tasks return `()`; results come back over `async_channel` senders
    /// moved into the future.
    #[derive(SystemParam)]
    pub struct TaskSpawner<'w, 's> {
        #[allow(dead_code)]
        _local: Local<'s, ()>,
        #[allow(dead_code)]
        _marker: std::marker::PhantomData<&'w ()>,
    }

    impl TaskSpawner<'_, '_> {
        /// Spawn a background task that runs to completion.
        ///
        /// No `Send` bound: the browser is single-threaded.
        pub fn spawn<F>(&self, future: F)
        where
            F: Future<Output = ()> + 'static,
        {
            AsyncComputeTaskPool::get().spawn_local(future).detach();
        }
    }
}

#[cfg(not(target_family = "wasm"))]
pub use native::TaskSpawner;
#[cfg(target_family = "wasm")]
pub use wasm::TaskSpawner;
