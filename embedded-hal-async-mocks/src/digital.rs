use embedded_hal::digital;
use embedded_hal_async::digital::Wait;
use mockall::mock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinError;

impl digital::Error for PinError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

mock! {
    #[derive(Debug)]
    pub OutputPin {}

    impl digital::ErrorType for OutputPin {
        type Error = PinError;
    }

    impl digital::OutputPin for OutputPin {
        fn set_low(&mut self) -> Result<(), PinError>;
        fn set_high(&mut self) -> Result<(), PinError>;
    }
}

mock! {
    #[derive(Debug)]
    pub WaitPin {}

    impl digital::ErrorType for WaitPin {
        type Error = PinError;
    }

    impl Wait for WaitPin {
        async fn wait_for_high(&mut self) -> Result<(), PinError>;
        async fn wait_for_low(&mut self) -> Result<(), PinError>;
        async fn wait_for_rising_edge(&mut self) -> Result<(), PinError>;
        async fn wait_for_falling_edge(&mut self) -> Result<(), PinError>;
        async fn wait_for_any_edge(&mut self) -> Result<(), PinError>;
    }
}
