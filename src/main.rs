use pushme::app::Monitor;
use winit::{dpi::LogicalSize, event::Event, event_loop::EventLoop, window::WindowBuilder};

fn main() {
    env_logger::init();

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("PushME Keypad Monitor")
        .with_inner_size(LogicalSize::new(480, 240))
        .build(&event_loop)
        .unwrap();

    let mut monitor = Monitor::new();

    event_loop.run(move |event, _, control_flow| {
        let flow_change = match event {
            Event::WindowEvent {
                window_id, event, ..
            } if window_id == window.id() => monitor.handle_window_event(event),
            Event::DeviceEvent { event, .. } => monitor.handle_device_event(event),
            Event::MainEventsCleared => monitor.handle_update(),
            _ => None,
        };

        if let Some(new_control_flow) = flow_change {
            *control_flow = new_control_flow;
        }
    })
}
