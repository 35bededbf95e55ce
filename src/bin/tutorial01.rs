use vkray::tutorials::init::InitTutorial;

fn main() {
    vkray::app::run::<InitTutorial>();
}
