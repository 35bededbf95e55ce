use vkray::tutorials::accel::AccelTutorial;

fn main() {
    vkray::app::run::<AccelTutorial>();
}
